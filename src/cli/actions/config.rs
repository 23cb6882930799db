use crate::pcdt::storage;
use anyhow::Result;

/// Handle the config action: read or write one operator override.
/// # Errors
/// Returns an error if the store is unreachable.
pub async fn execute(dsn: &str, key: &str, value: Option<&str>) -> Result<()> {
    let pool = storage::connect(dsn).await?;

    match value {
        Some(value) => {
            storage::config_set(&pool, key, value).await?;
            println!("{key} = {value}");
        }
        None => match storage::config_get(&pool, key).await? {
            Some(value) => println!("{key} = {value}"),
            None => println!("{key} is unset"),
        },
    }

    Ok(())
}
