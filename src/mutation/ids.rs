use crate::model::Guid;

/// Source of guids for new and pasted elements.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> Guid;
}

/// Deterministic ids: the prefix followed by a counter.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    counter: u64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: 0,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("element_")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Guid {
        self.counter += 1;
        format!("{}{}", self.prefix, self.counter)
    }
}

/// Random v4 uuids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> Guid {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Draws ids until one is not taken.
pub(crate) fn fresh_id(ids: &mut dyn IdGenerator, is_taken: impl Fn(&str) -> bool) -> Guid {
    loop {
        let id = ids.next_id();
        if !is_taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_skip_taken() {
        let mut ids = SequentialIds::new("n");
        let taken = ["n1".to_string(), "n2".to_string()];
        let id = fresh_id(&mut ids, |id| taken.iter().any(|t| t == id));
        assert_eq!(id, "n3");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
