//! Commission Reports
//! Customer-level payout reports: qualified customers per onboarding DSA,
//! and customers attributed to the DSA that handled their deposits.

use crate::data::{Category, DsaRecord, PerCategory};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::info;

/// DSA label for transacting customers missing from the onboarding file.
pub const NOT_ONBOARDED: &str = "Not Onboarded";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    round2(part as f64 / whole.max(1) as f64 * 100.0)
}

/// One customer's activity across deposit, ticket and scan files.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerActivity {
    /// Onboarding DSA, or [`NOT_ONBOARDED`]
    pub dsa_id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub deposited: bool,
    pub bought_ticket: bool,
    pub did_scan: bool,
    pub ticket_amount: f64,
    pub scan_amount: f64,
}

impl CustomerActivity {
    /// Deposited and then either bought a ticket or scanned.
    pub fn is_qualified(&self) -> bool {
        self.deposited && (self.bought_ticket || self.did_scan)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedDsa {
    pub dsa_id: String,
    pub customers: usize,
    pub deposits: usize,
    pub tickets: usize,
    pub scans: usize,
    pub payment: f64,
}

/// Conversion of every customer a DSA onboarded, qualified or not.
#[derive(Debug, Clone, PartialEq)]
pub struct DsaConversion {
    pub dsa_id: String,
    pub customers: usize,
    pub deposited: usize,
    pub bought_ticket: usize,
    pub did_scan: usize,
    pub ticket_amount: f64,
    pub scan_amount: f64,
    /// Percentages rounded to two decimals
    pub ticket_rate: f64,
    pub scan_rate: f64,
    pub deposit_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualifiedReport {
    /// Qualified customers sorted by DSA then customer
    pub customers: Vec<CustomerActivity>,
    pub per_dsa: Vec<QualifiedDsa>,
    pub conversion: Vec<DsaConversion>,
    /// Transacting customers with no onboarding row
    pub not_onboarded: Vec<CustomerActivity>,
}

impl QualifiedReport {
    pub fn total_payment(&self) -> f64 {
        self.per_dsa.iter().map(|d| d.payment).sum()
    }

    /// Keep only rows whose DSA passes `allows`.
    pub fn filtered(&self, allows: impl Fn(&str) -> bool) -> Self {
        Self {
            customers: self
                .customers
                .iter()
                .filter(|c| allows(&c.dsa_id))
                .cloned()
                .collect(),
            per_dsa: self
                .per_dsa
                .iter()
                .filter(|d| allows(&d.dsa_id))
                .cloned()
                .collect(),
            conversion: self
                .conversion
                .iter()
                .filter(|d| allows(&d.dsa_id))
                .cloned()
                .collect(),
            not_onboarded: self
                .not_onboarded
                .iter()
                .filter(|c| allows(&c.dsa_id))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Default)]
struct CustomerTotals {
    ticket_amount: f64,
    scan_amount: f64,
}

/// Qualified-customer payout report.
///
/// Onboarded customers come from onboarding rows carrying a customer id; the
/// first row per customer wins. Ticket and scan activity is the amount sum
/// per customer being positive. Tickets sold to non-customer entities are
/// ignored.
pub fn qualified_customers(data: &PerCategory<&[DsaRecord]>, rate: f64) -> QualifiedReport {
    let mut tickets: HashMap<&str, CustomerTotals> = HashMap::new();
    for record in data[Category::Ticket].iter().filter(|r| r.is_customer_entity()) {
        if let Some(customer) = record.customer_id.as_deref() {
            tickets.entry(customer).or_default().ticket_amount += record.amount.unwrap_or(0.0);
        }
    }
    let mut scans: HashMap<&str, CustomerTotals> = HashMap::new();
    for record in data[Category::Scan].iter() {
        if let Some(customer) = record.customer_id.as_deref() {
            scans.entry(customer).or_default().scan_amount += record.amount.unwrap_or(0.0);
        }
    }
    let depositors: BTreeSet<&str> = data[Category::Deposit]
        .iter()
        .filter_map(|r| r.customer_id.as_deref())
        .collect();

    let activity = |dsa_id: &str, customer: &str, name: Option<String>| {
        let ticket_amount = tickets.get(customer).map_or(0.0, |t| t.ticket_amount);
        let scan_amount = scans.get(customer).map_or(0.0, |t| t.scan_amount);
        CustomerActivity {
            dsa_id: dsa_id.to_string(),
            customer_id: customer.to_string(),
            customer_name: name,
            deposited: depositors.contains(customer),
            bought_ticket: ticket_amount > 0.0,
            did_scan: scan_amount > 0.0,
            ticket_amount,
            scan_amount,
        }
    };

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut onboarded: Vec<CustomerActivity> = Vec::new();
    for record in data[Category::Onboarding].iter() {
        let Some(customer) = record.customer_id.as_deref() else {
            continue;
        };
        if seen.insert(customer) {
            onboarded.push(activity(
                &record.dsa_id,
                customer,
                record.customer_name.clone(),
            ));
        }
    }

    let mut conversion: BTreeMap<&str, DsaConversion> = BTreeMap::new();
    for customer in &onboarded {
        let entry = conversion
            .entry(customer.dsa_id.as_str())
            .or_insert_with(|| DsaConversion {
                dsa_id: customer.dsa_id.clone(),
                customers: 0,
                deposited: 0,
                bought_ticket: 0,
                did_scan: 0,
                ticket_amount: 0.0,
                scan_amount: 0.0,
                ticket_rate: 0.0,
                scan_rate: 0.0,
                deposit_rate: 0.0,
            });
        entry.customers += 1;
        entry.deposited += usize::from(customer.deposited);
        entry.bought_ticket += usize::from(customer.bought_ticket);
        entry.did_scan += usize::from(customer.did_scan);
        entry.ticket_amount += customer.ticket_amount;
        entry.scan_amount += customer.scan_amount;
    }
    let conversion: Vec<DsaConversion> = conversion
        .into_values()
        .map(|mut c| {
            c.ticket_rate = percent(c.bought_ticket, c.customers);
            c.scan_rate = percent(c.did_scan, c.customers);
            c.deposit_rate = percent(c.deposited, c.customers);
            c
        })
        .collect();

    let mut qualified: Vec<CustomerActivity> =
        onboarded.into_iter().filter(|c| c.is_qualified()).collect();
    qualified.sort_by(|a, b| {
        (a.dsa_id.as_str(), a.customer_id.as_str()).cmp(&(b.dsa_id.as_str(), b.customer_id.as_str()))
    });

    let mut per_dsa: Vec<QualifiedDsa> = Vec::new();
    for customer in &qualified {
        if per_dsa.last().map(|d| d.dsa_id.as_str()) != Some(customer.dsa_id.as_str()) {
            per_dsa.push(QualifiedDsa {
                dsa_id: customer.dsa_id.clone(),
                customers: 0,
                deposits: 0,
                tickets: 0,
                scans: 0,
                payment: 0.0,
            });
        }
        if let Some(dsa) = per_dsa.last_mut() {
            dsa.customers += 1;
            dsa.deposits += usize::from(customer.deposited);
            dsa.tickets += usize::from(customer.bought_ticket);
            dsa.scans += usize::from(customer.did_scan);
            dsa.payment = dsa.customers as f64 * rate;
        }
    }

    let transacting: BTreeSet<&str> = tickets
        .keys()
        .chain(scans.keys())
        .copied()
        .chain(depositors.iter().copied())
        .collect();
    let not_onboarded: Vec<CustomerActivity> = transacting
        .into_iter()
        .filter(|customer| !seen.contains(customer))
        .map(|customer| activity(NOT_ONBOARDED, customer, None))
        .collect();

    let report = QualifiedReport {
        customers: qualified,
        per_dsa,
        conversion,
        not_onboarded,
    };
    info!(
        qualified = report.customers.len(),
        dsas = report.per_dsa.len(),
        not_onboarded = report.not_onboarded.len(),
        payment = report.total_payment(),
        "built qualified customer report"
    );
    report
}

/// How a deposit-handling DSA relates to the customer's onboarding DSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributionStatus {
    /// Onboarded by the same DSA
    Match,
    /// Onboarded by another DSA
    Mismatch,
    /// Not in the onboarding file
    NoOnboarding,
}

impl AttributionStatus {
    pub fn label(self) -> &'static str {
        match self {
            AttributionStatus::Match => "MATCH",
            AttributionStatus::Mismatch => "MISMATCH",
            AttributionStatus::NoOnboarding => "NO ONBOARDING",
        }
    }
}

impl fmt::Display for AttributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributedCustomer {
    /// DSA that handled the credit deposits
    pub dsa_id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub deposits: usize,
    pub tickets: usize,
    pub scans: usize,
    pub onboarded_by: Option<String>,
    pub status: AttributionStatus,
}

impl AttributedCustomer {
    pub fn is_active(&self) -> bool {
        self.tickets > 0 || self.scans > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributionDsa {
    pub dsa_id: String,
    /// Active customers only
    pub customers: usize,
    pub deposits: usize,
    pub tickets: usize,
    pub scans: usize,
    pub payment: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionReport {
    /// Active customers grouped by DSA (ascending), first-deposit order within a DSA
    pub customers: Vec<AttributedCustomer>,
    pub per_dsa: Vec<AttributionDsa>,
}

impl AttributionReport {
    pub fn total_payment(&self) -> f64 {
        self.per_dsa.iter().map(|d| d.payment).sum()
    }

    pub fn status_count(&self, status: AttributionStatus) -> usize {
        self.customers.iter().filter(|c| c.status == status).count()
    }

    /// Keep only rows whose DSA passes `allows`.
    pub fn filtered(&self, allows: impl Fn(&str) -> bool) -> Self {
        Self {
            customers: self
                .customers
                .iter()
                .filter(|c| allows(&c.dsa_id))
                .cloned()
                .collect(),
            per_dsa: self
                .per_dsa
                .iter()
                .filter(|d| allows(&d.dsa_id))
                .cloned()
                .collect(),
        }
    }
}

/// Customer names by source priority: onboarding (last row wins), then the
/// first named row of deposit, ticket and scan in turn.
fn customer_names(data: &PerCategory<&[DsaRecord]>) -> HashMap<String, String> {
    let mut names: HashMap<String, String> = HashMap::new();
    for (category, records) in data.iter() {
        for record in records.iter() {
            let (Some(customer), Some(name)) = (&record.customer_id, &record.customer_name) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if category == Category::Onboarding {
                names.insert(customer.clone(), name.to_string());
            } else {
                names.entry(customer.clone()).or_insert_with(|| name.to_string());
            }
        }
    }
    names
}

struct DsaEntry {
    dsa_id: String,
    customers: Vec<AttributedCustomer>,
    index: HashMap<String, usize>,
}

/// Deposit attribution payout report.
///
/// Credit deposits whose customer differs from the handling DSA attribute
/// that customer to the DSA. Each debit ticket or scan row of the customer
/// is credited to the earliest-seen DSA holding them. Only customers with
/// ticket or scan activity are reported.
pub fn deposit_attribution(
    data: &PerCategory<&[DsaRecord]>,
    credit_type: &str,
    debit_type: &str,
    rate: f64,
) -> AttributionReport {
    let names = customer_names(data);
    let onboarding: HashMap<&str, &str> = data[Category::Onboarding]
        .iter()
        .filter_map(|r| r.customer_id.as_deref().map(|c| (c, r.dsa_id.as_str())))
        .collect();

    let mut entries: Vec<DsaEntry> = Vec::new();
    let mut entry_index: HashMap<String, usize> = HashMap::new();

    for record in data[Category::Deposit].iter() {
        if !record.is_transaction_type(credit_type) {
            continue;
        }
        let Some(customer) = record.customer_id.as_deref() else {
            continue;
        };
        if customer == record.dsa_id {
            continue;
        }

        let slot = *entry_index.entry(record.dsa_id.clone()).or_insert_with(|| {
            entries.push(DsaEntry {
                dsa_id: record.dsa_id.clone(),
                customers: Vec::new(),
                index: HashMap::new(),
            });
            entries.len() - 1
        });
        let entry = &mut entries[slot];

        let position = match entry.index.get(customer) {
            Some(&position) => position,
            None => {
                let onboarded_by = onboarding.get(customer).map(|dsa| dsa.to_string());
                let status = match onboarded_by.as_deref() {
                    None => AttributionStatus::NoOnboarding,
                    Some(dsa) if dsa == record.dsa_id => AttributionStatus::Match,
                    Some(_) => AttributionStatus::Mismatch,
                };
                entry.customers.push(AttributedCustomer {
                    dsa_id: record.dsa_id.clone(),
                    customer_id: customer.to_string(),
                    customer_name: names.get(customer).cloned(),
                    deposits: 0,
                    tickets: 0,
                    scans: 0,
                    onboarded_by,
                    status,
                });
                entry.index.insert(customer.to_string(), entry.customers.len() - 1);
                entry.customers.len() - 1
            }
        };
        entry.customers[position].deposits += 1;
    }

    let mut owner: HashMap<String, (usize, usize)> = HashMap::new();
    for (slot, entry) in entries.iter().enumerate() {
        for (position, customer) in entry.customers.iter().enumerate() {
            owner
                .entry(customer.customer_id.clone())
                .or_insert((slot, position));
        }
    }

    for category in [Category::Ticket, Category::Scan] {
        for record in data[category].iter() {
            if !record.is_transaction_type(debit_type) {
                continue;
            }
            let Some(&(slot, position)) =
                record.customer_id.as_deref().and_then(|c| owner.get(c))
            else {
                continue;
            };
            let customer = &mut entries[slot].customers[position];
            if category == Category::Ticket {
                customer.tickets += 1;
            } else {
                customer.scans += 1;
            }
        }
    }

    entries.sort_by(|a, b| a.dsa_id.cmp(&b.dsa_id));

    let mut report = AttributionReport::default();
    for entry in entries {
        let active: Vec<AttributedCustomer> =
            entry.customers.into_iter().filter(|c| c.is_active()).collect();
        if active.is_empty() {
            continue;
        }
        report.per_dsa.push(AttributionDsa {
            dsa_id: entry.dsa_id,
            customers: active.len(),
            deposits: active.iter().map(|c| c.deposits).sum(),
            tickets: active.iter().map(|c| c.tickets).sum(),
            scans: active.iter().map(|c| c.scans).sum(),
            payment: active.len() as f64 * rate,
        });
        report.customers.extend(active);
    }

    info!(
        dsas = report.per_dsa.len(),
        active_customers = report.customers.len(),
        matched = report.status_count(AttributionStatus::Match),
        payment = report.total_payment(),
        "built deposit attribution report"
    );
    report
}
