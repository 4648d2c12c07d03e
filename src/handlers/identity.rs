use tracing::info;

use crate::models::error::Result;
use crate::storage::KeyValueStore;

pub const USER_ID_KEY: &str = "trackingUserId";

/// Returns the install's tracking id, generating and persisting one on first use.
pub async fn tracking_user_id<S: KeyValueStore + ?Sized>(store: &S) -> Result<String> {
    if let Some(id) = store.get_item(USER_ID_KEY).await? {
        if !id.trim().is_empty() {
            return Ok(id);
        }
    }
    let id = uuid::Uuid::new_v4().to_string();
    store.set_item(USER_ID_KEY, &id).await?;
    info!(user_id = %id, "generated tracking user id");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn id_is_stable() {
        let store = MemoryStore::new();
        let first = tracking_user_id(&store).await.unwrap();
        let second = tracking_user_id(&store).await.unwrap();
        assert_eq!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }
}
