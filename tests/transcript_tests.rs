// Unit tests for the bounded rolling transcript.
//
// The transcript is append-only, capped at a fixed number of entries, and
// evicts the oldest entry first once the cap is reached.

use advisor_voice::session::{Speaker, Transcript, TurnRecord};

fn turn(speaker: Speaker, text: &str) -> TurnRecord {
    TurnRecord {
        speaker,
        text: text.to_string(),
    }
}

#[test]
fn test_entries_appended_in_order() {
    let mut transcript = Transcript::new(10);

    transcript.push(turn(Speaker::User, "first"));
    transcript.push(turn(Speaker::Advisor, "second"));

    let entries = transcript.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "first");
    assert_eq!(entries[0].speaker, Speaker::User);
    assert_eq!(entries[1].text, "second");
    assert_eq!(entries[1].speaker, Speaker::Advisor);
}

#[test]
fn test_push_exchange_appends_user_then_advisor() {
    let mut transcript = Transcript::new(10);

    transcript.push_exchange("question".to_string(), "answer".to_string());

    let entries = transcript.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].speaker, Speaker::User);
    assert_eq!(entries[1].speaker, Speaker::Advisor);
}

#[test]
fn test_never_exceeds_limit() {
    let mut transcript = Transcript::new(10);

    for i in 0..8 {
        transcript.push_exchange(format!("u{}", i), format!("a{}", i));
    }

    assert_eq!(transcript.len(), 10);
}

#[test]
fn test_oldest_evicted_first() {
    let mut transcript = Transcript::new(10);

    for i in 0..6 {
        transcript.push_exchange(format!("u{}", i), format!("a{}", i));
    }

    // 12 entries pushed; the first exchange (u0/a0) must be gone.
    let entries = transcript.entries();
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[0].text, "u1");
    assert_eq!(entries[9].text, "a5");
}

#[test]
fn test_limit_one_keeps_latest() {
    let mut transcript = Transcript::new(1);

    transcript.push(turn(Speaker::User, "old"));
    transcript.push(turn(Speaker::Advisor, "new"));

    let entries = transcript.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "new");
}

#[test]
fn test_limit_zero_retains_nothing() {
    let mut transcript = Transcript::new(0);

    // Must drop the record instead of looping on eviction.
    transcript.push(turn(Speaker::User, "dropped"));
    transcript.push_exchange("also".to_string(), "dropped".to_string());

    assert!(transcript.is_empty());
    assert_eq!(transcript.len(), 0);
}

#[test]
fn test_wire_roles() {
    assert_eq!(Speaker::User.wire_role(), "user");
    assert_eq!(Speaker::Advisor.wire_role(), "model");
}

#[test]
fn test_empty_transcript() {
    let transcript = Transcript::new(10);
    assert!(transcript.is_empty());
    assert_eq!(transcript.len(), 0);
    assert!(transcript.entries().is_empty());
}
