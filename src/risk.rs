//! Path, pattern and vocabulary heuristics for risk scoring.
//!
//! The graph builder and the embedder both score files with these functions.
//! They do so independently: the embedder may run before, or without, a graph.

use crate::types::{CodeRecord, FunctionFact, RiskLevel, SecurityPatternFact};

/// Upper bound of every risk and relevance score.
pub const MAX_RISK: f32 = 10.0;

/// Path fragments that mark security- or money-sensitive code.
pub const CRITICAL_PATH_TERMS: &[&str] = &[
    "auth",
    "login",
    "session",
    "password",
    "secret",
    "token",
    "crypto",
    "security",
    "permission",
    "admin",
    "payment",
    "billing",
    "checkout",
    "wallet",
    "invoice",
    "tax",
];

/// Path fragments that mark code receiving externally-influenced data.
pub const BOUNDARY_PATH_TERMS: &[&str] = &[
    "controller",
    "route",
    "router",
    "handler",
    "endpoint",
    "gateway",
    "middleware",
    "webhook",
    "resolver",
    "api",
];

/// Security vocabulary, also seeded into the embedding vocabulary.
pub const SECURITY_TERMS: &[&str] = &[
    "auth",
    "authenticate",
    "authorization",
    "bcrypt",
    "cookie",
    "cors",
    "credential",
    "crypto",
    "csrf",
    "decrypt",
    "encrypt",
    "escape",
    "eval",
    "exec",
    "hash",
    "hmac",
    "injection",
    "jwt",
    "password",
    "permission",
    "role",
    "sanitize",
    "secret",
    "session",
    "signature",
    "sql",
    "token",
    "validate",
    "verify",
    "xss",
];

/// Business-domain vocabulary of the analysed marketplace.
pub const BUSINESS_TERMS: &[&str] = &[
    "account",
    "balance",
    "billing",
    "cart",
    "cheque",
    "checkout",
    "currency",
    "customer",
    "discount",
    "invoice",
    "ledger",
    "order",
    "organization",
    "payment",
    "payout",
    "price",
    "pricelist",
    "proforma",
    "refund",
    "settlement",
    "subscription",
    "tax",
    "transaction",
    "vat",
    "wallet",
];

/// Clamp a raw score into `[0, 10]`. NaN collapses to zero.
pub fn clamp_risk(score: f32) -> f32 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_RISK)
}

/// Round a risk score to the integer scale used by embedding metadata.
pub fn to_score(score: f32) -> u8 {
    clamp_risk(score).round() as u8
}

fn path_lower(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Lower-cased words of an identifier or path. Splits on every
/// non-alphanumeric character and on camelCase humps (`APIController` gives
/// `api`, `controller`).
pub fn word_tokens(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_lower {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Whole-word match, tolerating a plural `s` (`payments`, `routes`).
fn token_is(token: &str, term: &str) -> bool {
    token == term || token.strip_suffix('s') == Some(term)
}

fn has_term(tokens: &[String], terms: &[&str]) -> bool {
    tokens
        .iter()
        .any(|t| terms.iter().any(|term| token_is(t, term)))
}

/// True when a path word names security- or money-sensitive code.
pub fn is_critical_path(path: &str) -> bool {
    has_term(&word_tokens(path), CRITICAL_PATH_TERMS)
}

/// True when a path word names an inbound surface (controller, route, handler...).
pub fn is_boundary_path(path: &str) -> bool {
    has_term(&word_tokens(path), BOUNDARY_PATH_TERMS)
}

/// Path-based criticality contribution.
pub fn path_score(path: &str) -> f32 {
    let mut score = 0.0;
    if is_critical_path(path) {
        score += 2.0;
    }
    if is_boundary_path(path) {
        score += 1.0;
    }
    score
}

/// Severity-weighted sum of findings, capped so findings alone cannot saturate the scale.
pub fn pattern_score(patterns: &[SecurityPatternFact]) -> f32 {
    let sum: f32 = patterns.iter().map(|p| p.severity.weight()).sum();
    sum.min(6.0)
}

/// Contribution of function complexity and per-function risk levels.
pub fn complexity_score(functions: &[FunctionFact]) -> f32 {
    let max = functions.iter().map(|f| f.complexity).max().unwrap_or(0);
    let mut score = if max > 20 {
        2.0
    } else if max > 10 {
        1.0
    } else {
        0.0
    };
    let risky = functions
        .iter()
        .filter(|f| f.risk_level >= RiskLevel::High)
        .count() as f32;
    score += (risky * 0.5).min(2.0);
    score
}

/// Fraction of imports that did not resolve inside the project, scaled to `[0, 2]`.
pub fn external_import_score(total_imports: usize, unresolved: usize) -> f32 {
    if total_imports == 0 {
        return 0.0;
    }
    2.0 * unresolved as f32 / total_imports as f32
}

/// Whether the record declares itself as a trust boundary.
pub fn declares_trust_boundary(record: &CodeRecord) -> bool {
    is_boundary_path(&record.path) || record.functions.iter().any(|f| f.trust_boundary)
}

/// Security relevance of a whole file on the integer 0-10 scale.
pub fn security_relevance(record: &CodeRecord) -> u8 {
    to_score(
        pattern_score(&record.security_patterns)
            + path_score(&record.path)
            + complexity_score(&record.functions),
    )
}

/// Security relevance of a single function.
pub fn function_relevance(record: &CodeRecord, function: &FunctionFact) -> u8 {
    let base = match function.risk_level {
        RiskLevel::Low => 1.0,
        RiskLevel::Medium => 3.0,
        RiskLevel::High => 6.0,
        RiskLevel::Critical => 8.0,
    };
    let boundary = if function.trust_boundary { 1.0 } else { 0.0 };
    to_score(base + boundary + path_score(&record.path) / 2.0)
}

/// Security relevance of a group of findings of one pattern type.
pub fn pattern_group_relevance(patterns: &[&SecurityPatternFact]) -> u8 {
    let max = patterns
        .iter()
        .map(|p| p.severity)
        .max()
        .unwrap_or(RiskLevel::Low);
    let base = match max {
        RiskLevel::Low => 3.0,
        RiskLevel::Medium => 5.0,
        RiskLevel::High => 7.0,
        RiskLevel::Critical => 9.0,
    };
    // Repeated findings of the same family push relevance up a notch.
    let repeat = if patterns.len() > 3 { 1.0 } else { 0.0 };
    to_score(base + repeat)
}

/// Business terms appearing as whole words, in vocabulary order, deduplicated.
pub fn business_terms(text: &str) -> Vec<&'static str> {
    let tokens = word_tokens(text);
    BUSINESS_TERMS
        .iter()
        .copied()
        .filter(|term| tokens.iter().any(|t| token_is(t, term)))
        .collect()
}

/// Business criticality on the integer 0-10 scale.
pub fn business_criticality(record: &CodeRecord) -> u8 {
    let in_path = business_terms(&record.path).len() as f32;
    let in_content = business_terms(&record.content).len() as f32;
    to_score(in_path * 2.0 + in_content * 0.5)
}

/// Simple `*` wildcard match against a file name.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// True when the file name matches one of the entry conventions (`main.*`, `*.controller.*`...).
pub fn matches_entry_convention(path: &str, patterns: &[String]) -> bool {
    let file = path_lower(path);
    let file = file.rsplit('/').next().unwrap_or(&file);
    patterns.iter().any(|p| wildcard_match(&p.to_lowercase(), file))
}

/// True when the path lives under one of the application roots.
pub fn is_under_application_root(path: &str, roots: &[String]) -> bool {
    let path = path_lower(path);
    roots.iter().any(|root| {
        let root = root.trim_matches('/').to_lowercase();
        path.starts_with(&format!("{root}/")) || path.contains(&format!("/{root}/"))
    })
}
