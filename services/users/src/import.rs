//! Reading import rows from delimited text
//!
//! The first line is a header naming the columns
//! (`firstName,lastName,username,email,password`); snake_case names are
//! accepted too. Header names and the name, username and email cells are
//! trimmed; the password cell is kept exactly as written.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::info;

use crate::{
    error::{UserError, UserResult},
    models::NewUser,
};

/// Parse rows from CSV text
pub fn parse_rows(data: &[u8]) -> UserResult<Vec<NewUser>> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(data);

    reader
        .deserialize::<NewUser>()
        .enumerate()
        .map(|(i, row)| {
            // Line numbers count the header as line 1
            row.map(trim_identity_cells)
                .map_err(|e| UserError::InvalidImport(format!("line {}: {}", i + 2, e)))
        })
        .collect()
}

fn trim_identity_cells(row: NewUser) -> NewUser {
    NewUser {
        first_name: row.first_name.trim().to_string(),
        last_name: row.last_name.trim().to_string(),
        username: row.username.trim().to_string(),
        email: row.email.trim().to_string(),
        password: row.password,
    }
}

/// Read and parse a seed file
pub async fn read_seed_file(path: &Path) -> UserResult<Vec<NewUser>> {
    info!("Reading seed file {}", path.display());

    let data = tokio::fs::read(path).await.map_err(|e| {
        UserError::InvalidImport(format!("cannot read {}: {}", path.display(), e))
    })?;

    let rows = parse_rows(&data)?;
    info!("Parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
