//! # Parser
//!
//! Compiles rule text into a [`RuleSet`]. Compilation is atomic: the first
//! error aborts it and no partial rule set is produced.
//!
//! Blanks (space and tab) around any token are insignificant. Empty rules,
//! such as a trailing `;`, are ignored.

use crate::error::{ParseError, ParseResult};
use crate::flags::{IdKind, Supplementary, TargetFlags};
use crate::rule::{IdSpec, Rule, RuleSet, MAX_LEN};

/// Compile rule text with the default length limit.
///
/// # Arguments
///
/// * `text` - Rule specification, shorter than [`MAX_LEN`] bytes
///
/// # Returns
///
/// The compiled rule set, or the first error with its byte offset
///
/// # Example
///
/// ```
/// use credgate_rules::compile;
///
/// let set = compile("uid=1001>uid=1010,gid=1010").unwrap();
/// assert_eq!(set.len(), 1);
///
/// let err = compile("uid=1001>user=1010").unwrap_err();
/// assert_eq!(err.offset, 9);
/// ```
pub fn compile(text: &str) -> ParseResult<RuleSet> {
    compile_with_limit(text, MAX_LEN)
}

/// Compile rule text, accepting at most `max_len - 1` bytes.
///
/// `max_len` can only tighten [`MAX_LEN`], never relax it.
pub fn compile_with_limit(text: &str, max_len: usize) -> ParseResult<RuleSet> {
    let max_len = max_len.min(MAX_LEN);
    if text.len() >= max_len {
        let limit = max_len.saturating_sub(1);
        return Err(ParseError::new(
            limit,
            format!("rule specification longer than {} bytes", limit),
        ));
    }

    let mut rules: Vec<Rule> = Vec::new();
    for segment in Segment::whole(text).split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        rules.push(parse_rule(segment)?);
    }

    Ok(RuleSet::new(text.to_string(), rules))
}

/// A slice of the rule text that remembers where it starts.
#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Segment<'a> {
    fn whole(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }

    fn is_blank(c: char) -> bool {
        c == ' ' || c == '\t'
    }

    fn trim(self) -> Self {
        let start = self.text.trim_start_matches(Self::is_blank);
        let skipped = self.text.len() - start.len();
        Self {
            text: start.trim_end_matches(Self::is_blank),
            offset: self.offset + skipped,
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn split(self, sep: char) -> impl Iterator<Item = Segment<'a>> {
        let base = self.offset;
        self.text.split(sep).scan(0usize, move |start, piece| {
            let segment = Segment {
                text: piece,
                offset: base + *start,
            };
            *start += piece.len() + sep.len_utf8();
            Some(segment)
        })
    }

    /// Split at the first character in `seps`.
    fn split_once(self, seps: &[char]) -> Option<(Segment<'a>, Segment<'a>)> {
        let idx = self.text.find(seps)?;
        let sep_len = self.text[idx..].chars().next().map_or(1, char::len_utf8);
        Some((
            Segment {
                text: &self.text[..idx],
                offset: self.offset,
            },
            Segment {
                text: &self.text[idx + sep_len..],
                offset: self.offset + idx + sep_len,
            },
        ))
    }

    /// Drop the first `n` bytes.
    fn advance(self, n: usize) -> Self {
        Self {
            text: &self.text[n..],
            offset: self.offset + n,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.offset, message)
    }
}

/// Right-hand side of a typed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdExpr {
    /// `.`: the requester's current ids.
    Current,
    /// `*` or `any`.
    Any,
    /// An explicit id.
    Id(u32),
}

fn parse_rule(segment: Segment<'_>) -> ParseResult<Rule> {
    let (from, targets) = segment
        .split_once(&['>', ':'])
        .ok_or_else(|| segment.error("missing '>' between the 'from' clause and the targets"))?;

    let (from_kind, from_id) = parse_from(from.trim())?;
    let mut builder = RuleBuilder::new(from_kind, from_id);

    let targets = targets.trim();
    if targets.is_empty() {
        return Err(targets.error("no target clause"));
    }
    for target in targets.split(',') {
        builder.add_target(target.trim())?;
    }

    builder.finish(segment)
}

fn parse_from(segment: Segment<'_>) -> ParseResult<(IdKind, u32)> {
    if segment.is_empty() {
        return Err(segment.error("missing 'from' clause"));
    }
    let (kind, id) = segment
        .split_once(&['='])
        .ok_or_else(|| segment.error("expected 'uid=<id>' or 'gid=<id>' as 'from' clause"))?;

    let kind_seg = kind.trim();
    let kind = match IdKind::parse(kind_seg.text) {
        Some(kind @ (IdKind::Uid | IdKind::Gid)) => kind,
        _ => {
            return Err(kind_seg.error(format!(
                "'from' type must be 'uid' or 'gid', not '{}'",
                kind_seg.text
            )))
        }
    };

    Ok((kind, parse_id(id.trim())?))
}

/// Parse a base-10 id. Negative values wrap to their two's-complement
/// unsigned value, so `-1` is the largest id.
fn parse_id(segment: Segment<'_>) -> ParseResult<u32> {
    let valid_start = segment
        .text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-');
    if !valid_start {
        return Err(segment.error(if segment.is_empty() {
            "missing id".to_string()
        } else {
            format!("invalid id '{}'", segment.text)
        }));
    }

    let value: i64 = segment
        .text
        .parse()
        .map_err(|_| segment.error(format!("invalid id '{}'", segment.text)))?;
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(segment.error(format!("id '{}' out of range", segment.text)));
    }
    Ok(value as u32)
}

fn parse_id_expr(segment: Segment<'_>) -> ParseResult<IdExpr> {
    match segment.text {
        "." => Ok(IdExpr::Current),
        "*" | "any" => Ok(IdExpr::Any),
        _ => parse_id(segment).map(IdExpr::Id),
    }
}

/// Accumulates one rule's targets and checks them as they arrive.
struct RuleBuilder {
    from_kind: IdKind,
    from_id: u32,
    uid_flags: TargetFlags,
    uids: Vec<IdSpec>,
    gid_flags: TargetFlags,
    gids: Vec<IdSpec>,
    targets: usize,
    saw_uid: bool,
    saw_bare_any: bool,
}

impl RuleBuilder {
    fn new(from_kind: IdKind, from_id: u32) -> Self {
        Self {
            from_kind,
            from_id,
            uid_flags: TargetFlags::default(),
            uids: Vec::new(),
            gid_flags: TargetFlags::default(),
            gids: Vec::new(),
            targets: 0,
            saw_uid: false,
            saw_bare_any: false,
        }
    }

    fn add_target(&mut self, target: Segment<'_>) -> ParseResult<()> {
        if target.is_empty() {
            return Err(target.error("empty target clause"));
        }
        if self.saw_bare_any {
            return Err(target.error("'any' must be the only target"));
        }

        // Optional flag, then the type.
        let mut flag = None;
        let mut rest = target;
        if let Some(mode) = rest.text.chars().next().and_then(Supplementary::from_flag) {
            flag = Some(mode);
            rest = rest.advance(1).trim();
            if rest.text.chars().next().and_then(Supplementary::from_flag).is_some() {
                return Err(rest.error("at most one flag is allowed per target"));
            }
        }

        let Some((kind, id)) = rest.split_once(&['=']) else {
            return self.add_bare(rest, flag);
        };
        let kind_seg = kind.trim();
        let id = id.trim();

        match IdKind::parse(kind_seg.text) {
            Some(IdKind::Uid) => {
                if flag.is_some() {
                    return Err(target.error("'uid' targets take no flag"));
                }
                self.add_uid(id, parse_id_expr(id)?)?;
            }
            Some(IdKind::Gid) => self.add_gid(id, flag, parse_id_expr(id)?)?,
            Some(IdKind::Any) => {
                return Err(id.error("the 'any' target takes no id"));
            }
            None => {
                return Err(kind_seg.error(format!(
                    "target type must be 'uid', 'gid' or 'any', not '{}'",
                    kind_seg.text
                )));
            }
        }

        self.targets += 1;
        Ok(())
    }

    fn add_bare(&mut self, rest: Segment<'_>, flag: Option<Supplementary>) -> ParseResult<()> {
        if IdKind::parse(rest.text) != Some(IdKind::Any) {
            return Err(rest.error(format!("expected '<type>=<id>', found '{}'", rest.text)));
        }
        if flag.is_some() {
            return Err(rest.error("the 'any' target takes no flag"));
        }
        if self.targets > 0 {
            return Err(rest.error("'any' must be the only target"));
        }

        self.uid_flags.any = true;
        self.gid_flags.any = true;
        self.gid_flags.any_supplementary = true;
        self.gid_flags.has_primary_clause = true;
        self.gid_flags.has_supplementary_clause = true;
        self.saw_bare_any = true;
        self.targets += 1;
        Ok(())
    }

    fn add_uid(&mut self, at: Segment<'_>, expr: IdExpr) -> ParseResult<()> {
        if self.uid_flags.any {
            return Err(at.error("'uid=any' must be the only uid target"));
        }

        match expr {
            IdExpr::Any => {
                if self.saw_uid {
                    return Err(at.error("'uid=any' must be the only uid target"));
                }
                self.uid_flags.any = true;
            }
            IdExpr::Current => {
                if self.uid_flags.current {
                    return Err(at.error("duplicate 'uid=.' target"));
                }
                self.uid_flags.current = true;
            }
            IdExpr::Id(uid) => {
                if self.uids.iter().any(|spec| spec.id == uid) {
                    return Err(at.error(format!("duplicate uid {} in targets", uid)));
                }
                self.uids.push(IdSpec {
                    id: uid,
                    flags: TargetFlags::default(),
                });
            }
        }

        self.saw_uid = true;
        Ok(())
    }

    fn add_gid(
        &mut self,
        at: Segment<'_>,
        flag: Option<Supplementary>,
        expr: IdExpr,
    ) -> ParseResult<()> {
        match flag {
            None => self.gid_flags.has_primary_clause = true,
            Some(_) => self.gid_flags.has_supplementary_clause = true,
        }

        match expr {
            IdExpr::Any => match flag {
                None => self.gid_flags.any = true,
                Some(Supplementary::Allowed) => self.gid_flags.any_supplementary = true,
                Some(_) => {
                    return Err(at.error(
                        "any group can only be allowed ('+'), not required or forbidden, as supplementary",
                    ))
                }
            },
            IdExpr::Current => {
                if !self.gid_flags.merge(&TargetFlags::for_target(flag)) {
                    return Err(at.error("incompatible supplementary flags for current groups"));
                }
                self.gid_flags.current = true;
            }
            IdExpr::Id(gid) => {
                let flags = TargetFlags::for_target(flag);
                match self.gids.iter_mut().find(|spec| spec.id == gid) {
                    Some(spec) => {
                        if !spec.flags.merge(&flags) {
                            return Err(at.error(format!(
                                "incompatible supplementary flags for gid {}",
                                gid
                            )));
                        }
                    }
                    None => self.gids.push(IdSpec { id: gid, flags }),
                }
                if flag == Some(Supplementary::Required) {
                    self.gid_flags.has_explicit_required = true;
                }
            }
        }

        Ok(())
    }

    fn finish(mut self, rule: Segment<'_>) -> ParseResult<Rule> {
        if !self.saw_uid && !self.saw_bare_any {
            // uid=.
            self.uid_flags.current = true;
        }

        let flags = &mut self.gid_flags;
        match (flags.has_primary_clause, flags.has_supplementary_clause) {
            (false, false) => {
                // gid=.,!gid=.
                flags.current = true;
                flags.primary = true;
                flags.supplementary = Supplementary::Required;
            }
            (false, true) => {
                return Err(rule.error(
                    "supplementary group targets given without any primary group target",
                ));
            }
            _ => {}
        }

        self.uids.sort_unstable_by_key(|spec| spec.id);
        self.gids.sort_unstable_by_key(|spec| spec.id);

        Ok(Rule {
            from_kind: self.from_kind,
            from_id: self.from_id,
            uid_flags: self.uid_flags,
            uids: self.uids,
            gid_flags: self.gid_flags,
            gids: self.gids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> Rule {
        let set = compile(text).unwrap();
        assert_eq!(set.len(), 1);
        set.rules()[0].clone()
    }

    fn error(text: &str) -> ParseError {
        compile(text).unwrap_err()
    }

    #[test]
    fn test_simple_rule() {
        let rule = parse_one("uid=1001>uid=1010,gid=1010");
        assert_eq!(rule.from_kind, IdKind::Uid);
        assert_eq!(rule.from_id, 1001);
        assert_eq!(rule.uids.len(), 1);
        assert_eq!(rule.uids[0].id, 1010);
        assert!(!rule.uid_flags.current);
        assert_eq!(rule.gids.len(), 1);
        assert!(rule.gids[0].flags.primary);
        assert!(rule.gid_flags.has_primary_clause);
        assert!(!rule.gid_flags.has_supplementary_clause);
        assert!(!rule.gid_flags.current);
    }

    #[test]
    fn test_legacy_colon_separator() {
        let rule = parse_one("gid=20:uid=5");
        assert_eq!(rule.from_kind, IdKind::Gid);
        assert_eq!(rule.uids[0].id, 5);
    }

    #[test]
    fn test_blanks_are_insignificant() {
        let set = compile(" uid = 1001 >\tuid = 1010 , + gid = * , gid = . ; ").unwrap();
        let rule = &set.rules()[0];
        assert_eq!(rule.uids[0].id, 1010);
        assert!(rule.gid_flags.any_supplementary);
        assert!(rule.gid_flags.current);
        assert!(rule.gid_flags.primary);
    }

    #[test]
    fn test_empty_rules_are_ignored() {
        assert!(compile("").unwrap().is_empty());
        assert!(compile(";;  ;\t").unwrap().is_empty());
        assert_eq!(compile(";uid=1>uid=2;;gid=3>any;").unwrap().len(), 2);
    }

    #[test]
    fn test_default_targets() {
        let rule = parse_one("uid=1001>uid=1010");
        assert!(!rule.uid_flags.current);
        assert!(rule.gid_flags.current);
        assert!(rule.gid_flags.primary);
        assert_eq!(rule.gid_flags.supplementary, Supplementary::Required);

        let rule = parse_one("gid=5>gid=6");
        assert!(rule.uid_flags.current);
        assert!(!rule.gid_flags.current);
    }

    #[test]
    fn test_bare_any() {
        for text in ["gid=1010>any", "gid=1010>*", "gid=1010> any "] {
            let rule = parse_one(text);
            assert!(rule.uid_flags.any);
            assert!(rule.gid_flags.any);
            assert!(rule.gid_flags.any_supplementary);
            assert!(!rule.uid_flags.current);
            assert!(!rule.gid_flags.current);
        }
    }

    #[test]
    fn test_bare_any_is_exclusive() {
        assert_eq!(error("uid=1>any,uid=2").offset, 10);
        assert_eq!(error("uid=1>uid=2,any").offset, 12);
        assert!(error("uid=1>+any").message.contains("no flag"));
        assert!(error("uid=1>any=5").message.contains("no id"));
    }

    #[test]
    fn test_uid_any_is_exclusive() {
        assert!(error("uid=1>uid=*,uid=2").message.contains("only uid target"));
        assert!(error("uid=1>uid=2,uid=any").message.contains("only uid target"));
        assert!(error("uid=1>uid=.,uid=*").message.contains("only uid target"));
        assert!(parse_one("uid=1>uid=*").uid_flags.any);
    }

    #[test]
    fn test_duplicate_uid_is_rejected() {
        let err = error("uid=1>uid=2,uid=2");
        assert_eq!(err.offset, 16);
        assert!(err.message.contains("duplicate uid 2"));
        assert!(error("uid=1>uid=.,uid=.").message.contains("duplicate"));
    }

    #[test]
    fn test_uid_takes_no_flag() {
        assert!(error("uid=1>+uid=2").message.contains("no flag"));
    }

    #[test]
    fn test_gid_flags() {
        let rule = parse_one("uid=1>gid=1,+gid=2,!gid=3,-gid=4");
        let flags: Vec<(u32, bool, Supplementary)> = rule
            .gids
            .iter()
            .map(|s| (s.id, s.flags.primary, s.flags.supplementary))
            .collect();
        assert_eq!(
            flags,
            vec![
                (1, true, Supplementary::Unspecified),
                (2, false, Supplementary::Allowed),
                (3, false, Supplementary::Required),
                (4, false, Supplementary::Forbidden),
            ]
        );
        assert!(rule.gid_flags.has_explicit_required);
        assert!(rule.gid_flags.has_supplementary_clause);
    }

    #[test]
    fn test_duplicate_gids_are_coalesced() {
        let rule = parse_one("uid=1>gid=10,+gid=10,!gid=10");
        assert_eq!(rule.gids.len(), 1);
        assert!(rule.gids[0].flags.primary);
        assert_eq!(rule.gids[0].flags.supplementary, Supplementary::Required);

        let rule = parse_one("uid=1>gid=10,gid=10");
        assert_eq!(rule.gids.len(), 1);
    }

    #[test]
    fn test_incompatible_gid_flags() {
        let err = error("uid=1>gid=1,!gid=10,-gid=10");
        assert_eq!(err.offset, 25);
        assert!(err.message.contains("gid 10"));
        assert!(error("uid=1>gid=1,+gid=10,-gid=10").message.contains("incompatible"));
        assert!(error("uid=1>gid=.,!gid=.,-gid=.").message.contains("current"));
    }

    #[test]
    fn test_multiple_flags_are_rejected() {
        assert!(error("uid=1>gid=1,+!gid=2").message.contains("one flag"));
    }

    #[test]
    fn test_gid_any_categories() {
        let rule = parse_one("uid=1>gid=*");
        assert!(rule.gid_flags.any);
        assert!(!rule.gid_flags.any_supplementary);

        let rule = parse_one("uid=1>gid=5,+gid=any");
        assert!(!rule.gid_flags.any);
        assert!(rule.gid_flags.any_supplementary);

        let rule = parse_one("uid=1>gid=*,+gid=*");
        assert!(rule.gid_flags.any);
        assert!(rule.gid_flags.any_supplementary);

        assert!(error("uid=1>gid=1,!gid=*").message.contains("only be allowed"));
        assert!(error("uid=1>gid=1,-gid=any").message.contains("only be allowed"));
    }

    #[test]
    fn test_supplementary_without_primary() {
        let err = error("uid=1>uid=2;uid=3>+gid=4");
        assert_eq!(err.offset, 12);
        assert!(err.message.contains("primary"));
    }

    #[test]
    fn test_negative_ids_wrap() {
        let rule = parse_one("uid=-1>uid=-2");
        assert_eq!(rule.from_id, u32::MAX);
        assert_eq!(rule.uids[0].id, u32::MAX - 1);
        assert_eq!(parse_one("uid=4294967295>uid=0").from_id, u32::MAX);
    }

    #[test]
    fn test_id_range() {
        assert!(error("uid=4294967296>uid=0").message.contains("out of range"));
        assert!(error("uid=-2147483649>uid=0").message.contains("out of range"));
        assert!(error("uid=99999999999999999999>uid=0").message.contains("invalid id"));
        assert!(error("uid=+5>uid=0").message.contains("invalid id"));
        assert!(error("uid=abc>uid=0").message.contains("invalid id"));
        assert!(error("uid=>uid=0").message.contains("missing id"));
    }

    #[test]
    fn test_from_clause_errors() {
        let err = error("user=1>uid=2");
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("'from' type"));

        assert!(error("any=1>uid=2").message.contains("'from' type"));
        assert!(error("uid=*>uid=2").message.contains("invalid id"));
        assert!(error(">uid=2").message.contains("missing 'from'"));
        assert!(error("uid1>uid=2").message.contains("'from' clause"));
        assert!(error("uid=1 uid=2").message.contains("missing '>'"));
    }

    #[test]
    fn test_target_errors() {
        assert_eq!(error("uid=1>").offset, 6);
        let err = error("uid=1>uid=2,,gid=3");
        assert_eq!(err.offset, 12);
        assert!(err.message.contains("empty target"));

        let err = error("uid=1>usr=2");
        assert_eq!(err.offset, 6);
        assert!(err.message.contains("target type"));

        assert!(error("uid=1>uid").message.contains("expected"));
    }

    #[test]
    fn test_error_offset_in_later_rule() {
        let text = "uid=1>uid=2; gid=5>gid=x";
        let err = error(text);
        assert_eq!(err.offset, 23);
        assert_eq!(&text[err.offset..], "x");
    }

    #[test]
    fn test_supplementary_only_rules_are_rejected() {
        let err = error("gid=5>+gid=10;gid=5>!gid=10");
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("primary"));
    }

    #[test]
    fn test_repeated_from_is_kept_in_order() {
        let set = compile("uid=5>uid=6;uid=5>uid=7;gid=5>gid=6").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.rules()[0].uids[0].id, 6);
        assert_eq!(set.rules()[1].uids[0].id, 7);
    }

    #[test]
    fn test_length_limit() {
        let long = format!("uid=1>uid=2;{}", " ".repeat(MAX_LEN));
        let err = error(&long);
        assert_eq!(err.offset, MAX_LEN - 1);

        let exact = " ".repeat(MAX_LEN - 1);
        assert!(compile(&exact).unwrap().is_empty());

        let err = compile_with_limit("uid=1>uid=2", 8).unwrap_err();
        assert_eq!(err.offset, 7);
        assert!(compile_with_limit("uid=1>uid=2", 4096).is_ok());
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let text = " uid=1 > uid=2 ;";
        assert_eq!(compile(text).unwrap().text(), text);
    }
}
