//! Credential collaborator contract: one opaque string gating detection.

/// Get/set/clear of the single detection credential. Absence blocks any
/// detection attempt; the UI prompts for one to be supplied.
pub trait CredentialStore {
    fn get(&self) -> Option<String>;
    fn set(&mut self, credential: &str);
    fn clear(&mut self);
}

/// Session-scoped credential store. Persistence is deliberately not offered
/// here; a persistent backend would implement the same trait.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Option<String>,
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.value.clone()
    }

    fn set(&mut self, credential: &str) {
        let trimmed = credential.trim();
        self.value = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        };
    }

    fn clear(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_counts_as_absent() {
        let mut store = MemoryCredentialStore::default();
        store.set("   ");
        assert_eq!(store.get(), None);
        store.set(" sk-123 ");
        assert_eq!(store.get(), Some("sk-123".to_owned()));
        store.clear();
        assert_eq!(store.get(), None);
    }
}
