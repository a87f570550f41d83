//! Linking strategies: grouping touchpoints by resolved identity and
//! estimating how trustworthy the linking was.

use std::collections::HashMap;

use touchflow_core::error::AttributionError;
use touchflow_core::table::TouchpointTable;
use touchflow_core::types::{Journey, LinkingMethod, Touchpoint};
use touchflow_core::CoreResult;
use tracing::{debug, info, warn};

use crate::journey::build_journey;

/// Aggregate linking can never be more trustworthy than this.
const AGGREGATE_CONFIDENCE_CEILING: f64 = 0.6;

/// How strongly fuzzy email matches discount email-only confidence.
const FUZZY_MATCH_PENALTY: f64 = 0.5;

/// Outcome of one resolver run.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub journeys: Vec<Journey>,
    pub confidence: f64,
    /// The concrete method applied (never `auto`).
    pub method_used: LinkingMethod,
    /// Malformed rows dropped during validation.
    pub records_dropped: usize,
    pub warnings: Vec<String>,
}

/// Select the best linking method from the table's column coverage.
///
/// Priority: customer_id when >80% of rows carry one; session+email when
/// both columns have values; email-only when >60% of rows carry an email;
/// aggregate otherwise.
pub fn select_linking_method(table: &TouchpointTable) -> LinkingMethod {
    let coverage = table.coverage();
    let method = if coverage.customer_id > 0.8 {
        LinkingMethod::CustomerId
    } else if coverage.session_id > 0.0 && coverage.email > 0.0 {
        LinkingMethod::SessionEmail
    } else if coverage.email > 0.6 {
        LinkingMethod::EmailOnly
    } else {
        LinkingMethod::Aggregate
    };
    debug!(
        customer_id_coverage = coverage.customer_id,
        session_id_coverage = coverage.session_id,
        email_coverage = coverage.email,
        selected = ?method,
        "linking method selected"
    );
    method
}

/// Partitions a touchpoint table into journeys under one linking method.
pub struct IdentityResolver {
    window_days: u32,
}

impl IdentityResolver {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// Resolve the table into journeys.
    ///
    /// Malformed rows are dropped and counted; rows a method cannot link
    /// (e.g. null customer_id under the customer_id method) are dropped
    /// with a warning rather than diluting attribution as noise.
    pub fn resolve(
        &self,
        table: &TouchpointTable,
        method: LinkingMethod,
    ) -> CoreResult<Resolution> {
        if table.is_empty() {
            return Err(AttributionError::InsufficientData(
                "touchpoint table is empty".to_string(),
            ));
        }

        let (touchpoints, records_dropped) = table.validate();
        let mut warnings = Vec::new();
        if records_dropped > 0 {
            warnings.push(format!(
                "{records_dropped} malformed records dropped (unparseable timestamp, empty channel, or negative revenue)"
            ));
        }
        if touchpoints.is_empty() {
            return Err(AttributionError::InsufficientData(
                "no valid touchpoints remain after dropping malformed records".to_string(),
            ));
        }

        let method_used = match method {
            LinkingMethod::Auto => select_linking_method(table),
            concrete => concrete,
        };

        let (groups, mut confidence) = match method_used {
            LinkingMethod::CustomerId => group_by_customer_id(&touchpoints, &mut warnings),
            LinkingMethod::SessionEmail => group_by_session_email(&touchpoints, &mut warnings),
            LinkingMethod::EmailOnly => group_by_email(&touchpoints, &mut warnings),
            LinkingMethod::Aggregate => (group_by_day(&touchpoints), 0.0),
            LinkingMethod::Auto => unreachable!("auto resolves to a concrete method"),
        };

        let journeys: Vec<Journey> = groups
            .into_iter()
            .filter_map(|(key, group)| build_journey(key, group, self.window_days))
            .collect();

        if method_used == LinkingMethod::Aggregate {
            confidence = aggregate_confidence(&journeys);
            warn!("aggregate linking in use, journeys are statistical approximations");
            warnings.push(
                "aggregate linking in use: journeys are statistical approximations, not individual customers"
                    .to_string(),
            );
        }

        info!(
            method = ?method_used,
            journeys = journeys.len(),
            confidence,
            "identity resolution complete"
        );

        Ok(Resolution {
            journeys,
            confidence,
            method_used,
            records_dropped,
            warnings,
        })
    }
}

// ─── Grouping ───────────────────────────────────────────────────────────

/// Identity groups in first-seen key order, so resolution is deterministic
/// and idempotent for a given input.
struct Grouper {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<Touchpoint>)>,
}

impl Grouper {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, touchpoint: Touchpoint) {
        match self.index.get(key) {
            Some(&i) => self.groups[i].1.push(touchpoint),
            None => {
                self.index.insert(key.to_string(), self.groups.len());
                self.groups.push((key.to_string(), vec![touchpoint]));
            }
        }
    }

    fn into_groups(self) -> Vec<(String, Vec<Touchpoint>)> {
        self.groups
    }
}

fn group_by_customer_id(
    touchpoints: &[Touchpoint],
    warnings: &mut Vec<String>,
) -> (Vec<(String, Vec<Touchpoint>)>, f64) {
    let mut grouper = Grouper::new();
    let mut unlinked = 0usize;

    for tp in touchpoints {
        match tp.customer_id.as_deref() {
            Some(customer_id) => grouper.push(customer_id, tp.clone()),
            None => unlinked += 1,
        }
    }

    if unlinked > 0 {
        warnings.push(format!(
            "{unlinked} touchpoints without customer_id excluded from linking"
        ));
    }
    let confidence = (touchpoints.len() - unlinked) as f64 / touchpoints.len() as f64;
    (grouper.into_groups(), confidence)
}

fn group_by_session_email(
    touchpoints: &[Touchpoint],
    warnings: &mut Vec<String>,
) -> (Vec<(String, Vec<Touchpoint>)>, f64) {
    // First non-null email observed in a session names the whole session,
    // so sessions sharing an email stitch into one journey.
    let mut session_email: HashMap<&str, String> = HashMap::new();
    for tp in touchpoints {
        if let (Some(session_id), Some(email)) = (tp.session_id.as_deref(), tp.email.as_deref()) {
            session_email
                .entry(session_id)
                .or_insert_with(|| normalize_email(email));
        }
    }

    let mut grouper = Grouper::new();
    let mut unlinked = 0usize;
    let mut with_session = 0usize;
    let mut with_email = 0usize;

    for tp in touchpoints {
        if tp.session_id.is_some() {
            with_session += 1;
        }
        if tp.email.is_some() {
            with_email += 1;
        }

        let key = match (tp.session_id.as_deref(), tp.email.as_deref()) {
            (Some(session_id), _) => match session_email.get(session_id) {
                Some(email) => format!("email:{email}"),
                None => format!("session:{session_id}"),
            },
            (None, Some(email)) => format!("email:{}", normalize_email(email)),
            (None, None) => {
                unlinked += 1;
                continue;
            }
        };
        grouper.push(&key, tp.clone());
    }

    if unlinked > 0 {
        warnings.push(format!(
            "{unlinked} touchpoints without session_id or email excluded from linking"
        ));
    }

    let total = touchpoints.len() as f64;
    let session_coverage = with_session as f64 / total;
    let email_coverage = with_email as f64 / total;
    let confidence = 0.6 * session_coverage + 0.4 * email_coverage;
    (grouper.into_groups(), confidence)
}

fn group_by_email(
    touchpoints: &[Touchpoint],
    warnings: &mut Vec<String>,
) -> (Vec<(String, Vec<Touchpoint>)>, f64) {
    let mut grouper = Grouper::new();
    // normalized email -> (canonical key, linked via fuzzy match)
    let mut aliases: HashMap<String, (String, bool)> = HashMap::new();
    let mut canonical_keys: Vec<String> = Vec::new();
    let mut unlinked = 0usize;
    let mut linked = 0usize;
    let mut fuzzy = 0usize;

    for tp in touchpoints {
        let email = match tp.email.as_deref() {
            Some(email) => normalize_email(email),
            None => {
                unlinked += 1;
                continue;
            }
        };

        let (key, was_fuzzy) = match aliases.get(&email) {
            Some((key, was_fuzzy)) => (key.clone(), *was_fuzzy),
            None => {
                let fuzzy_key = canonical_keys
                    .iter()
                    .find(|key| within_edit_distance_one(key.as_str(), email.as_str()))
                    .cloned();
                match fuzzy_key {
                    Some(key) => {
                        aliases.insert(email.clone(), (key.clone(), true));
                        (key, true)
                    }
                    None => {
                        aliases.insert(email.clone(), (email.clone(), false));
                        canonical_keys.push(email.clone());
                        (email, false)
                    }
                }
            }
        };

        linked += 1;
        if was_fuzzy {
            fuzzy += 1;
        }
        grouper.push(&key, tp.clone());
    }

    if unlinked > 0 {
        warnings.push(format!(
            "{unlinked} touchpoints without email excluded from linking"
        ));
    }
    if fuzzy > 0 {
        debug!(fuzzy_matches = fuzzy, "fuzzy email matches applied");
    }

    let email_coverage = linked as f64 / touchpoints.len() as f64;
    let fuzzy_fraction = if linked > 0 {
        fuzzy as f64 / linked as f64
    } else {
        0.0
    };
    let confidence = email_coverage * (1.0 - FUZZY_MATCH_PENALTY * fuzzy_fraction);
    (grouper.into_groups(), confidence)
}

/// Synthetic statistical journeys: all touchpoints of one calendar day form
/// one journey. Used when no individual identifier is reliable.
fn group_by_day(touchpoints: &[Touchpoint]) -> Vec<(String, Vec<Touchpoint>)> {
    let mut grouper = Grouper::new();
    for tp in touchpoints {
        let key = format!("aggregate:{}", tp.timestamp.date_naive());
        grouper.push(&key, tp.clone());
    }
    grouper.into_groups()
}

fn aggregate_confidence(journeys: &[Journey]) -> f64 {
    if journeys.is_empty() {
        return 0.0;
    }
    let average_length =
        journeys.iter().map(Journey::len).sum::<usize>() as f64 / journeys.len() as f64;
    let length_factor = (average_length / 5.0).min(1.0);
    (0.5 * (0.8 + 0.2 * length_factor)).min(AGGREGATE_CONFIDENCE_CEILING)
}

// ─── Email Matching ─────────────────────────────────────────────────────

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// True when `a` and `b` are within Levenshtein distance 1 (and not equal).
fn within_edit_distance_one(a: &str, b: &str) -> bool {
    if a == b {
        return false;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    match long.len() - short.len() {
        0 => short.iter().zip(long.iter()).filter(|(x, y)| x != y).count() == 1,
        1 => {
            let mut i = 0;
            let mut j = 0;
            let mut skipped = false;
            while i < short.len() && j < long.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if skipped {
                    return false;
                } else {
                    skipped = true;
                    j += 1;
                }
            }
            true
        }
        _ => false,
    }
}
