use super::types::SyncStatus;

pub fn valid_state_transition(src: &SyncStatus, dst: &SyncStatus) -> bool {
    match src {
        SyncStatus::Pending => matches!(dst, SyncStatus::Pulling),
        SyncStatus::Pulling => matches!(
            dst,
            SyncStatus::Pulling | SyncStatus::Pushing | SyncStatus::Success | SyncStatus::Failed
        ),
        SyncStatus::Pushing => matches!(
            dst,
            SyncStatus::Pushing | SyncStatus::Success | SyncStatus::Failed
        ),
        SyncStatus::Success | SyncStatus::Failed => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyncStatus::{Failed, Pending, Pulling, Pushing, Success};

    #[test]
    fn pending_only_moves_to_pulling() {
        assert!(valid_state_transition(&Pending, &Pulling));
        assert!(!valid_state_transition(&Pending, &Success));
        assert!(!valid_state_transition(&Pending, &Failed));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for dst in [Pending, Pulling, Pushing, Success, Failed] {
            assert!(!valid_state_transition(&Success, &dst));
            assert!(!valid_state_transition(&Failed, &dst));
        }
    }

    #[test]
    fn pulling_can_finish_either_way() {
        assert!(valid_state_transition(&Pulling, &Success));
        assert!(valid_state_transition(&Pulling, &Failed));
        assert!(!valid_state_transition(&Pushing, &Pulling));
    }
}
