use chrono::{Duration, Utc};
use keymint_license::{
    check_reactivate, check_suspend, effective_status, needs_expiry_promotion, LicenseError,
    LicenseState, StatusCode,
};

fn suspended_state() -> LicenseState {
    LicenseState::Suspended {
        at: Utc::now(),
        reason: "payment dispute".to_string(),
    }
}

// ── StatusCode ───────────────────────────────────────────────────

#[test]
fn status_code_spelling_roundtrip() {
    for code in [
        StatusCode::Active,
        StatusCode::Suspended,
        StatusCode::Expired,
        StatusCode::Revoked,
    ] {
        assert_eq!(StatusCode::parse(code.as_str()), Some(code));
    }
}

#[test]
fn status_code_parse_rejects_unknown() {
    assert_eq!(StatusCode::parse("paused"), None);
    assert_eq!(StatusCode::parse("Active"), None);
}

#[test]
fn status_code_display_matches_as_str() {
    assert_eq!(StatusCode::Suspended.to_string(), "suspended");
}

// ── LicenseState ─────────────────────────────────────────────────

#[test]
fn state_code_projection() {
    assert_eq!(LicenseState::Active.code(), StatusCode::Active);
    assert_eq!(suspended_state().code(), StatusCode::Suspended);
    assert_eq!(LicenseState::Expired.code(), StatusCode::Expired);
    assert_eq!(LicenseState::Revoked.code(), StatusCode::Revoked);
}

#[test]
fn suspension_reason_only_on_suspended() {
    assert_eq!(suspended_state().suspension_reason(), Some("payment dispute"));
    assert_eq!(LicenseState::Active.suspension_reason(), None);
}

#[test]
fn state_serde_roundtrip() {
    let state = suspended_state();
    let json = serde_json::to_string(&state).unwrap();
    assert!(json.contains("\"status\":\"suspended\""));
    let parsed: LicenseState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, state);
}

// ── effective_status ─────────────────────────────────────────────

#[test]
fn effective_active_before_expiry() {
    let now = Utc::now();
    let status = effective_status(&LicenseState::Active, now + Duration::days(1), now);
    assert_eq!(status, StatusCode::Active);
}

#[test]
fn effective_expired_after_expiry() {
    let now = Utc::now();
    let status = effective_status(&LicenseState::Active, now - Duration::seconds(1), now);
    assert_eq!(status, StatusCode::Expired);
}

#[test]
fn effective_reports_expiry_over_suspension_for_display() {
    // The display-level formula; reporting precedence for validity
    // checks is decided at the service layer.
    let now = Utc::now();
    let status = effective_status(&suspended_state(), now - Duration::days(1), now);
    assert_eq!(status, StatusCode::Expired);
}

#[test]
fn effective_passes_through_before_expiry() {
    let now = Utc::now();
    let expires = now + Duration::days(1);
    assert_eq!(effective_status(&suspended_state(), expires, now), StatusCode::Suspended);
    assert_eq!(effective_status(&LicenseState::Revoked, expires, now), StatusCode::Revoked);
}

// ── needs_expiry_promotion ───────────────────────────────────────

#[test]
fn promotion_only_for_active_past_expiry() {
    let now = Utc::now();
    let past = now - Duration::hours(1);
    let future = now + Duration::hours(1);

    assert!(needs_expiry_promotion(&LicenseState::Active, past, now));
    assert!(!needs_expiry_promotion(&LicenseState::Active, future, now));
    assert!(!needs_expiry_promotion(&suspended_state(), past, now));
    assert!(!needs_expiry_promotion(&LicenseState::Expired, past, now));
    assert!(!needs_expiry_promotion(&LicenseState::Revoked, past, now));
}

// ── check_suspend ────────────────────────────────────────────────

#[test]
fn suspend_legal_from_active() {
    assert!(check_suspend(&LicenseState::Active, "non-payment").is_ok());
}

#[test]
fn suspend_requires_reason() {
    let result = check_suspend(&LicenseState::Active, "   ");
    assert!(matches!(result, Err(LicenseError::InvalidInput(_))));
}

#[test]
fn suspend_twice_is_already_in_state() {
    let result = check_suspend(&suspended_state(), "again");
    assert!(matches!(
        result,
        Err(LicenseError::AlreadyInState(StatusCode::Suspended))
    ));
}

#[test]
fn suspend_from_expired_is_illegal() {
    let result = check_suspend(&LicenseState::Expired, "too late");
    assert!(matches!(
        result,
        Err(LicenseError::IllegalTransition {
            from: StatusCode::Expired,
            to: StatusCode::Suspended,
        })
    ));
}

#[test]
fn suspend_from_revoked_is_illegal() {
    let result = check_suspend(&LicenseState::Revoked, "too late");
    assert!(matches!(
        result,
        Err(LicenseError::IllegalTransition { from: StatusCode::Revoked, .. })
    ));
}

// ── check_reactivate ─────────────────────────────────────────────

#[test]
fn reactivate_legal_from_suspended_before_expiry() {
    let now = Utc::now();
    assert!(check_reactivate(&suspended_state(), now + Duration::days(1), now).is_ok());
}

#[test]
fn reactivate_refused_past_expiry() {
    // Suspension takes precedence for reporting, but a past-expiry
    // suspended license can never come back.
    let now = Utc::now();
    let expires = now - Duration::days(1);
    let result = check_reactivate(&suspended_state(), expires, now);
    assert!(matches!(result, Err(LicenseError::Expired(e)) if e == expires));
}

#[test]
fn reactivate_on_active_is_already_in_state() {
    let now = Utc::now();
    let result = check_reactivate(&LicenseState::Active, now + Duration::days(1), now);
    assert!(matches!(
        result,
        Err(LicenseError::AlreadyInState(StatusCode::Active))
    ));
}

#[test]
fn reactivate_from_expired_is_illegal() {
    let now = Utc::now();
    let result = check_reactivate(&LicenseState::Expired, now - Duration::days(1), now);
    assert!(matches!(
        result,
        Err(LicenseError::IllegalTransition {
            from: StatusCode::Expired,
            to: StatusCode::Active,
        })
    ));
}

#[test]
fn reactivate_from_revoked_is_illegal() {
    let now = Utc::now();
    let result = check_reactivate(&LicenseState::Revoked, now + Duration::days(1), now);
    assert!(matches!(
        result,
        Err(LicenseError::IllegalTransition { from: StatusCode::Revoked, .. })
    ));
}
