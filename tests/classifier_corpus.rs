//! Classification over a realistic board/phase corpus
//!
//! The keyword defaults have to hold up against the board and phase names
//! dispatchers actually type into the CRM, Polish and English mixed, with
//! inconsistent casing. These cases come from real deployment data.

use fleetmap::crm::types::{RawBoard, RawPhase};
use fleetmap::{BoardResolution, ClassifyConfig, JobType, PhaseIndex};

fn board(id: u64, name: &str) -> RawBoard {
    RawBoard { id, name: name.to_string() }
}

fn phase(id: u64, name: &str) -> RawPhase {
    RawPhase { id, name: name.to_string() }
}

#[test]
fn resolves_boards_from_deployment_names() {
    let cases = [
        ("Dostarczenie maszyny", "Serwis"),
        ("DOSTARCZENIE", "serwis polowy"),
        ("Delivery pipeline", "Field Service"),
        ("Transport krajowy", "Naprawy gwarancyjne"),
    ];

    for (transport_name, service_name) in cases {
        let boards = vec![board(1, transport_name), board(2, service_name)];
        let resolution = BoardResolution::resolve(&boards, &ClassifyConfig::default()).unwrap();
        assert_eq!(
            resolution.transport.as_ref().map(|b| b.id),
            Some(1),
            "transport board not matched: {transport_name}"
        );
        assert_eq!(
            resolution.service.as_ref().map(|b| b.id),
            Some(2),
            "service board not matched: {service_name}"
        );
    }
}

#[test]
fn transport_phases_classify_against_defaults() {
    let config = ClassifyConfig::default();

    let active = [
        "Przygotowanie maszyny",
        "Transport LUPUS lub inny",
        "Gotowe do wysyłki",
        "PRZYGOTOWANIE",
    ];
    let inactive = ["Maszyna u klienta", "Anulowane", "Archiwum"];

    let mut phases: Vec<RawPhase> = Vec::new();
    for (i, name) in active.iter().chain(inactive.iter()).enumerate() {
        phases.push(phase(i as u64, name));
    }

    let index = PhaseIndex::build(&phases, &[], &config);
    for i in 0..active.len() as u64 {
        assert_eq!(index.classify(i), Some(JobType::Transport), "{}", active[i as usize]);
    }
    for i in active.len() as u64..(active.len() + inactive.len()) as u64 {
        assert_eq!(index.classify(i), None, "{}", inactive[(i as usize) - active.len()]);
    }
}

#[test]
fn service_phases_classify_against_defaults() {
    let config = ClassifyConfig::default();

    let active = [
        "Zgłoszenie usterki",
        "Diagnoza",
        "Rozwiązanie problemu",
        "Termin serwisu",
        "W trakcie naprawy",
    ];
    let inactive = ["Wykonanie", "Zamknięte", "Faktura wystawiona"];

    let mut phases: Vec<RawPhase> = Vec::new();
    for (i, name) in active.iter().chain(inactive.iter()).enumerate() {
        phases.push(phase(100 + i as u64, name));
    }

    let index = PhaseIndex::build(&[], &phases, &config);
    for i in 0..active.len() {
        assert_eq!(
            index.classify(100 + i as u64),
            Some(JobType::Service),
            "{}",
            active[i]
        );
    }
    for i in active.len()..active.len() + inactive.len() {
        assert_eq!(index.classify(100 + i as u64), None, "{}", inactive[i - active.len()]);
    }
}

#[test]
fn transport_wins_when_phase_sets_overlap() {
    // A service board named so that one of its phases also matches a
    // transport keyword. Phase ids are board-scoped in practice, but if a
    // misconfigured keyword set puts one id in both active sets the
    // transport check runs first.
    let config = ClassifyConfig::default();
    let shared = [phase(7, "Transport i diagnoza")];
    let index = PhaseIndex::build(&shared, &shared, &config);
    assert_eq!(index.classify(7), Some(JobType::Transport));
}

#[test]
fn done_phases_are_not_active() {
    // "Maszyna u klienta" and "Wykonanie" are the stage-advance
    // destinations; a job landing there must drop out on the next refresh.
    let config = ClassifyConfig::default();
    let index = PhaseIndex::build(
        &[phase(12, "Maszyna u klienta")],
        &[phase(22, "Wykonanie")],
        &config,
    );
    assert_eq!(index.classify(12), None);
    assert_eq!(index.classify(22), None);
}

#[test]
fn phase_names_survive_for_excluded_phases() {
    let config = ClassifyConfig::default();
    let index = PhaseIndex::build(&[phase(12, "Maszyna u klienta")], &[], &config);
    assert_eq!(index.phase_name(12), "Maszyna u klienta");
}
