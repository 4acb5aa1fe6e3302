//! Static, read-only knowledge the probe stage and the UI draw from.
//!
//! The detection catalog is an ordered list of (category, payloads, oracle)
//! rules. The probe stage walks it in order and stops at the first rule whose
//! oracle fires, so the catalog order is also the category priority.
//! Keeping it as data means rules can be tested without any networking.

use crate::core::models::VulnCategory;
use std::time::Duration;

/// Responses slower than this are treated as a fired sleep-style payload.
pub const DELAY_THRESHOLD: Duration = Duration::from_millis(4500);

/// What the oracle gets to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeObservation<'a> {
    pub body: &'a str,
    pub elapsed: Duration,
}

/// Decides whether a response shows that a payload worked.
#[derive(Debug, Clone, Copy)]
pub enum Oracle {
    /// Body contains one of the signatures (case-insensitive), or the
    /// response took longer than `DELAY_THRESHOLD`.
    SignatureOrDelay(&'static [&'static str]),
    /// Body contains the injected payload verbatim.
    Reflection,
}

impl Oracle {
    pub fn fires(&self, payload: &str, observation: &ProbeObservation<'_>) -> bool {
        match self {
            Oracle::SignatureOrDelay(signatures) => {
                if observation.elapsed > DELAY_THRESHOLD {
                    return true;
                }
                let body = observation.body.to_lowercase();
                signatures.iter().any(|sig| body.contains(sig))
            }
            Oracle::Reflection => !payload.is_empty() && observation.body.contains(payload),
        }
    }
}

pub struct DetectionRule {
    pub category: VulnCategory,
    pub payloads: &'static [&'static str],
    pub oracle: Oracle,
}

impl DetectionRule {
    pub fn matches(&self, payload: &str, observation: &ProbeObservation<'_>) -> bool {
        self.oracle.fires(payload, observation)
    }
}

const SQLI_PAYLOADS: &[&str] = &[
    "' OR '1'='1",
    "' OR 1=1--",
    "\" OR \"1\"=\"1",
    "1' ORDER BY 100--",
    "' AND SLEEP(5)--",
    "'; WAITFOR DELAY '0:0:5'--",
];

// Lower-case; compared against the lower-cased body.
const SQL_ERROR_SIGNATURES: &[&str] = &[
    "sql syntax",
    "mysql_fetch",
    "warning: mysql",
    "unclosed quotation mark",
    "quoted string not properly terminated",
    "ora-01756",
    "pg_query():",
    "syntax error at or near",
    "sqlite3.operationalerror",
    "sqlstate[",
    "microsoft ole db provider for sql server",
    "odbc sql server driver",
];

const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "\"><img src=x onerror=alert(1)>",
    "<svg/onload=alert(1)>",
    "'><svg onload=confirm(1)>",
];

const CMDI_PAYLOADS: &[&str] = &[
    "; id",
    "| id",
    "&& whoami",
    "; cat /etc/passwd",
    "| sleep 5",
    "; sleep 5",
];

const COMMAND_OUTPUT_SIGNATURES: &[&str] = &[
    "uid=",
    "gid=",
    "root:x:0:0",
    "/bin/bash",
    "/usr/sbin/nologin",
    "volume serial number",
    "directory of c:\\",
];

/// The ordered detection catalog.
pub static CATALOG: &[DetectionRule] = &[
    DetectionRule {
        category: VulnCategory::SqlInjection,
        payloads: SQLI_PAYLOADS,
        oracle: Oracle::SignatureOrDelay(SQL_ERROR_SIGNATURES),
    },
    DetectionRule {
        category: VulnCategory::CrossSiteScripting,
        payloads: XSS_PAYLOADS,
        oracle: Oracle::Reflection,
    },
    DetectionRule {
        category: VulnCategory::CommandInjection,
        payloads: CMDI_PAYLOADS,
        oracle: Oracle::SignatureOrDelay(COMMAND_OUTPUT_SIGNATURES),
    },
];

/// Human-readable explanation of a finding category, shown in the UI.
pub struct FindingDetail {
    pub category: VulnCategory,
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
}

static DETAILS: &[FindingDetail] = &[
    FindingDetail {
        category: VulnCategory::SqlInjection,
        title: "SQL Injection",
        description: "The parameter reaches a database query without being treated as data. The server either leaked a database error or stalled on a time-delay payload, so an attacker can likely read or modify data the application can reach.",
        remediation: "Use parameterised queries or prepared statements for every query built from request data. Do not surface raw database errors to clients.",
    },
    FindingDetail {
        category: VulnCategory::CrossSiteScripting,
        title: "Cross-Site Scripting",
        description: "The injected markup came back in the response without being escaped. A crafted link can run script in a victim's browser under this site's origin.",
        remediation: "Encode output for the context it lands in (HTML body, attribute, script) and add a restrictive Content-Security-Policy.",
    },
    FindingDetail {
        category: VulnCategory::CommandInjection,
        title: "OS Command Injection",
        description: "The parameter is passed to a system shell. The response contained command output or stalled on a sleep payload, so arbitrary commands likely run with the server's privileges.",
        remediation: "Avoid shelling out with request data. If unavoidable, call the program directly with an argument vector and validate input against a strict allow-list.",
    },
];

pub fn get_finding_detail(category: VulnCategory) -> Option<&'static FindingDetail> {
    DETAILS.iter().find(|detail| detail.category == category)
}
