//! Behavioural tests for compiled policies.
//!
//! These exercise `compile` and `decide` together the way the engine uses
//! them: text in, Allow or Deny out.

use credgate_rules::{compile, decide, Credential, Decision, RuleSet};

/// A spread of requesters and candidates used to compare rule sets.
fn credentials() -> Vec<Credential> {
    vec![
        Credential::new(0, 0),
        Credential::new(1001, 1001),
        Credential::new(1001, 1001).with_groups([20, 1010]),
        Credential::new(1010, 1010),
        Credential::new(1011, 1010).with_groups([5]),
        Credential::new(1001, 20).with_uids(1001, 1001, 0),
        Credential::new(u32::MAX, u32::MAX),
    ]
}

fn outcomes(rules: &RuleSet) -> Vec<Decision> {
    let creds = credentials();
    creds
        .iter()
        .flat_map(|old| creds.iter().map(move |new| (old, new)))
        .map(|(old, new)| decide(old, new, rules))
        .collect()
}

#[test]
fn test_compiling_twice_gives_identical_decisions() {
    let text = "uid=1001>uid=1010,gid=1010,+gid=20; gid=1010>any; uid=0>uid=*,gid=*,+gid=*";
    let first = compile(text).unwrap();
    let second = compile(text).unwrap();

    assert_eq!(first.rules(), second.rules());
    assert_eq!(outcomes(&first), outcomes(&second));
}

#[test]
fn test_empty_text_denies_everything() {
    let rules = compile("").unwrap();
    assert!(outcomes(&rules).iter().all(|d| *d == Decision::Deny));
}

#[test]
fn test_default_target_allows_unchanged_credentials() {
    let rules = compile("uid=1001>uid=.; gid=1010>uid=.; uid=0>uid=.").unwrap();
    for cred in credentials() {
        let applies = rules.rules().iter().any(|r| r.applies_to(&cred));
        let expected = if applies { Decision::Allow } else { Decision::Deny };
        assert_eq!(decide(&cred, &cred.clone(), &rules), expected, "{:?}", cred);
    }
}

#[test]
fn test_default_target_denies_added_groups() {
    let rules = compile("uid=1001>uid=.").unwrap();
    let old = Credential::new(1001, 1001).with_groups([20]);
    assert_eq!(decide(&old, &old.clone(), &rules), Decision::Allow);
    for extra in [0, 19, 21, 1010, u32::MAX] {
        let new = Credential::new(1001, 1001).with_groups([20, extra]);
        assert_eq!(decide(&old, &new, &rules), Decision::Deny, "group {}", extra);
    }
}

#[test]
fn test_incompatible_coalescing_is_a_compile_error() {
    assert!(compile("gid=5>+gid=10;gid=5>!gid=10").is_err());
    assert!(compile("gid=5>gid=5,+gid=10,-gid=10").is_err());
    assert!(compile("gid=5>gid=5,+gid=10,!gid=10").is_ok());
}

#[test]
fn test_denying_rule_does_not_fall_through() {
    let rules = compile("gid=20>uid=1010,gid=20; uid=1001>uid=*,gid=*,+gid=*").unwrap();
    let old = Credential::new(1001, 20);
    let new = Credential::new(0, 0);
    assert_eq!(decide(&old, &new, &rules), Decision::Deny);

    // The second rule alone would grant it.
    let alone = compile("uid=1001>uid=*,gid=*,+gid=*").unwrap();
    assert_eq!(decide(&old, &new, &alone), Decision::Allow);
}

#[test]
fn test_root_helper_policy() {
    // A user may become root with any groups, but never keep the
    // 'operator' group (5) as a supplementary group.
    let rules = compile("uid=1001>uid=0,gid=0,+gid=*,-gid=5").unwrap();
    let old = Credential::new(1001, 1001).with_groups([5, 20]);

    let ok = Credential::new(0, 0).with_groups([0, 20]);
    assert_eq!(decide(&old, &ok, &rules), Decision::Allow);

    let operator = Credential::new(0, 0).with_groups([5]);
    assert_eq!(decide(&old, &operator, &rules), Decision::Deny);

    let stay = Credential::new(1001, 0);
    assert_eq!(decide(&old, &stay, &rules), Decision::Deny);
}

#[test]
fn test_rule_set_serializes_for_inspection() {
    let rules = compile("uid=1001>uid=1010,+gid=20,gid=1010").unwrap();
    let json = serde_json::to_value(&rules).unwrap();

    assert_eq!(json["text"], "uid=1001>uid=1010,+gid=20,gid=1010");
    let rule = &json["rules"][0];
    assert_eq!(rule["from_kind"], "uid");
    assert_eq!(rule["from_id"], 1001);
    assert_eq!(rule["uids"][0]["id"], 1010);
    assert_eq!(rule["gids"][0]["id"], 20);
    assert_eq!(rule["gids"][0]["flags"]["supplementary"], "allowed");
    assert_eq!(rule["gids"][1]["flags"]["primary"], true);
    assert!(json["compiled_at"].is_string());
}

#[test]
fn test_parse_error_points_into_text() {
    let text = "uid=1001>uid=1010; gid=20>gid=20,!gid=7,-gid=7";
    let err = compile(text).unwrap_err();
    assert_eq!(&text[err.offset..], "7");
    assert!(err.to_string().starts_with(&format!("at offset {}:", err.offset)));
}
