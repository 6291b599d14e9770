//! Escrow payment status and the legal transition graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an escrowed payment.
///
/// `Held` is the initial state. `Released`, `Refunded`, and
/// `PartiallyRefunded` are terminal. `Disputed` suspends the automatic
/// release and is the only state that can move back to `Held`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
    PartiallyRefunded,
    Disputed,
}

impl EscrowStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EscrowStatus::Released | EscrowStatus::Refunded | EscrowStatus::PartiallyRefunded
        )
    }

    /// All states this status may legally move to.
    pub fn valid_transitions(&self) -> &'static [EscrowStatus] {
        use EscrowStatus::*;
        match self {
            Held => &[Released, Refunded, PartiallyRefunded, Disputed],
            Disputed => &[Held, Released, Refunded, PartiallyRefunded],
            Released | Refunded | PartiallyRefunded => &[],
        }
    }

    pub fn can_transition(&self, to: EscrowStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
            EscrowStatus::PartiallyRefunded => "partially_refunded",
            EscrowStatus::Disputed => "disputed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "held" => Some(EscrowStatus::Held),
            "released" => Some(EscrowStatus::Released),
            "refunded" => Some(EscrowStatus::Refunded),
            "partially_refunded" => Some(EscrowStatus::PartiallyRefunded),
            "disputed" => Some(EscrowStatus::Disputed),
            _ => None,
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [EscrowStatus; 5] = [
        EscrowStatus::Held,
        EscrowStatus::Released,
        EscrowStatus::Refunded,
        EscrowStatus::PartiallyRefunded,
        EscrowStatus::Disputed,
    ];

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in ALL {
            if status.is_terminal() {
                assert!(
                    status.valid_transitions().is_empty(),
                    "terminal {status} should block all transitions"
                );
            } else {
                assert!(!status.valid_transitions().is_empty());
            }
        }
    }

    #[test]
    fn disputed_can_reinstate_hold() {
        assert!(EscrowStatus::Disputed.can_transition(EscrowStatus::Held));
        assert!(!EscrowStatus::Released.can_transition(EscrowStatus::Held));
    }

    #[test]
    fn no_state_transitions_to_itself() {
        for status in ALL {
            assert!(!status.can_transition(status));
        }
    }

    #[test]
    fn all_states_reachable_from_held() {
        let mut visited = HashSet::new();
        let mut queue = vec![EscrowStatus::Held];
        while let Some(status) = queue.pop() {
            if !visited.insert(status) {
                continue;
            }
            queue.extend(status.valid_transitions());
        }
        for status in ALL {
            assert!(visited.contains(&status), "{status} unreachable from held");
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in ALL {
            assert_eq!(EscrowStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(EscrowStatus::from_str("pending"), None);
    }
}
