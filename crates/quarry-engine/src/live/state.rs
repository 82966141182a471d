use quarry_core::errors::{ExError, Result};

/// Last published state of a live query
#[derive(Debug, Clone)]
pub enum LiveState<T> {
    /// Initial load not finished yet
    Pending,
    Ready(T),
    /// Most recent fetch failed; the query stays live
    Failed(ExError),
    Closed,
}

impl<T> LiveState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LiveState::Pending)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, LiveState::Closed)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LiveState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ExError> {
        match self {
            LiveState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// `Ready`/`Failed` as a result; `None` while pending or once closed
    pub fn to_result(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        match self {
            LiveState::Ready(value) => Some(Ok(value.clone())),
            LiveState::Failed(err) => Some(Err(err.clone())),
            LiveState::Pending | LiveState::Closed => None,
        }
    }
}

impl<T> From<Result<T>> for LiveState<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => LiveState::Ready(value),
            Err(err) => LiveState::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::errors::ExErrorKind;

    #[test]
    fn test_result_conversion() {
        let ok: LiveState<u64> = Ok(3).into();
        assert_eq!(ok.value(), Some(&3));
        assert_eq!(ok.to_result().map(|r| r.ok()), Some(Some(3)));

        let failed: LiveState<u64> = Err(ExError::new(ExErrorKind::MalformedSql)).into();
        assert_eq!(failed.error().map(ExError::kind), Some(ExErrorKind::MalformedSql));
        assert!(failed.value().is_none());
    }

    #[test]
    fn test_pending_and_closed_have_no_result() {
        assert!(LiveState::<u64>::Pending.to_result().is_none());
        assert!(LiveState::<u64>::Closed.to_result().is_none());
        assert!(LiveState::<u64>::Pending.is_pending());
        assert!(LiveState::<u64>::Closed.is_closed());
    }
}
