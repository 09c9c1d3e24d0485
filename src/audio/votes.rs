use parking_lot::Mutex;
use serenity::model::id::UserId;
use std::collections::HashSet;

/// Votos necesarios para pasar un skip cuando el canal tiene muchos oyentes.
const MAX_SKIP_VOTES: usize = 3;

/// Registro de votos de skip para el track actual.
///
/// Cada oyente puede votar una sola vez; el conjunto se limpia en cada skip
/// ejecutado, sea por votación o inmediato.
#[derive(Debug, Default)]
pub struct SkipVotes {
    voters: Mutex<HashSet<UserId>>,
}

impl SkipVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un voto. Devuelve `false` si el usuario ya había votado.
    pub fn add(&self, voter: UserId) -> bool {
        self.voters.lock().insert(voter)
    }

    pub fn count(&self) -> usize {
        self.voters.lock().len()
    }

    pub fn clear(&self) {
        self.voters.lock().clear();
    }

    /// Votos requeridos para que el skip pase: todos los oyentes hasta un
    /// máximo de tres. Los bots no cuentan como oyentes.
    pub fn threshold(listeners: usize) -> usize {
        listeners.min(MAX_SKIP_VOTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn threshold_caps_at_three() {
        assert_eq!(SkipVotes::threshold(1), 1);
        assert_eq!(SkipVotes::threshold(2), 2);
        assert_eq!(SkipVotes::threshold(3), 3);
        assert_eq!(SkipVotes::threshold(4), 3);
        assert_eq!(SkipVotes::threshold(50), 3);
    }

    #[test]
    fn repeated_votes_do_not_count_twice() {
        let votes = SkipVotes::new();
        assert!(votes.add(UserId::new(7)));
        assert!(!votes.add(UserId::new(7)));
        assert!(votes.add(UserId::new(8)));
        assert_eq!(votes.count(), 2);
    }

    #[test]
    fn clear_empties_the_set() {
        let votes = SkipVotes::new();
        votes.add(UserId::new(1));
        votes.add(UserId::new(2));
        votes.clear();
        assert_eq!(votes.count(), 0);
        // Después de limpiar, los mismos usuarios pueden volver a votar.
        assert!(votes.add(UserId::new(1)));
    }
}
