#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use crate::client::{parse_date, parse_interval, BookingClient};
    use crate::clock::ManualClock;
    use crate::config::ArbiterConfig;
    use crate::error::Error;
    use crate::infrastructure_in_memory::{InMemoryLockStore, InMemoryReservationStore};
    use crate::test_support::{day, frozen_now, guest, iv, PROPERTY};
    use crate::types::*;

    fn client_with_clock() -> (BookingClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(frozen_now()));
        let client = BookingClient::with_parts(
            Arc::new(InMemoryLockStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            clock.clone(),
            ArbiterConfig::new(5).unwrap(),
        );
        (client, clock)
    }

    #[test]
    fn parse_helpers_accept_iso_dates() {
        assert_eq!(parse_date("2018-06-06").unwrap(), day("2018-06-06"));
        assert_eq!(parse_date(" 2018-06-06 ").unwrap(), day("2018-06-06"));
        assert_eq!(
            parse_interval("2018-06-06", "2018-06-10").unwrap(),
            iv("2018-06-06", "2018-06-10")
        );
    }

    #[test]
    fn parse_helpers_reject_bad_input() {
        let err = parse_date("2018-06-31").unwrap_err();
        assert!(matches!(err, Error::InvalidDate { ref input, .. } if input == "2018-06-31"));
        assert!(err.is_invalid_input());

        let err = parse_interval("2018-06-10", "2018-06-06").unwrap_err();
        assert!(matches!(err, Error::InvalidInterval(_)));
    }

    #[test]
    fn generated_tokens_are_url_safe_and_distinct() {
        let token = LockToken::generate();
        assert_eq!(token.as_str().chars().count(), LockToken::GENERATED_LEN);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        assert_ne!(token, LockToken::generate());
    }

    #[test]
    fn full_booking_flow() {
        let (client, clock) = client_with_clock();
        let mine = LockToken::generate();
        let theirs = LockToken::generate();
        assert_ne!(mine, theirs);
        assert_eq!(client.lease_minutes(), 5);

        let probe = client
            .check_availability(PROPERTY, "2018-06-06", "2018-06-10", &mine)
            .unwrap();
        assert!(probe.is_granted());
        assert_eq!(client.live_locks(PROPERTY).unwrap().len(), 1);

        let blocked = client
            .check_availability(PROPERTY, "2018-06-08", "2018-06-12", &theirs)
            .unwrap();
        assert_eq!(blocked.conflict_kind(), Some(ConflictKind::BeingLocked));

        clock.advance(Duration::minutes(1));
        let booked = client
            .confirm_reservation(PROPERTY, "2018-06-06", "2018-06-10", &mine, guest())
            .unwrap();
        assert!(booked.reservation().is_some());
        assert!(client.live_locks(PROPERTY).unwrap().is_empty());

        let refused = client
            .check_availability(PROPERTY, "2018-06-08", "2018-06-12", &theirs)
            .unwrap();
        assert_eq!(refused.conflict_kind(), Some(ConflictKind::AlreadyReserved));

        let reservations = client.reservations(PROPERTY).unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].interval, iv("2018-06-06", "2018-06-10"));
    }

    #[test]
    fn release_frees_dates_for_others() {
        let (client, _clock) = client_with_clock();
        let mine = LockToken::from("mine");
        let theirs = LockToken::from("theirs");

        client
            .check_availability(PROPERTY, "2018-06-06", "2018-06-10", &mine)
            .unwrap();
        assert!(client.release(PROPERTY, &mine).unwrap());
        assert!(!client.release(PROPERTY, &mine).unwrap());

        let outcome = client
            .check_availability(PROPERTY, "2018-06-06", "2018-06-10", &theirs)
            .unwrap();
        assert!(outcome.is_granted());
    }

    #[test]
    fn evict_expired_uses_configured_lease() {
        let (client, clock) = client_with_clock();
        client
            .check_availability(PROPERTY, "2018-06-06", "2018-06-10", &LockToken::from("a"))
            .unwrap();
        clock.advance(Duration::minutes(3));
        client
            .check_availability(PropertyId(2), "2018-06-06", "2018-06-10", &LockToken::from("b"))
            .unwrap();

        clock.advance(Duration::minutes(2));
        assert_eq!(client.evict_expired().unwrap(), 1);
        assert_eq!(client.live_locks(PropertyId(2)).unwrap().len(), 1);
    }

    #[test]
    fn invalid_dates_never_reach_the_stores() {
        let (client, _clock) = client_with_clock();
        let err = client
            .check_availability(PROPERTY, "2018-06-10", "2018-06-10", &LockToken::from("a"))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(client.live_locks(PROPERTY).unwrap().is_empty());
    }

    #[test]
    fn config_parsing() {
        assert_eq!(ArbiterConfig::default().lease_minutes, 10);
        assert_eq!(ArbiterConfig::parse(" 5 ").unwrap().lease(), Duration::minutes(5));
        assert!(matches!(ArbiterConfig::parse("five"), Err(Error::Config(_))));
        assert!(matches!(ArbiterConfig::new(0), Err(Error::Config(_))));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_client_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookings.db");
        let client = BookingClient::with_sqlite(path.to_str().unwrap(), ArbiterConfig::default()).unwrap();
        let token = LockToken::generate();

        assert!(client
            .check_availability(PROPERTY, "2018-06-06", "2018-06-10", &token)
            .unwrap()
            .is_granted());
        assert!(client
            .confirm_reservation(PROPERTY, "2018-06-06", "2018-06-10", &token, guest())
            .unwrap()
            .reservation()
            .is_some());
        assert_eq!(client.reservations(PROPERTY).unwrap().len(), 1);
        assert!(client.live_locks(PROPERTY).unwrap().is_empty());
    }
}
