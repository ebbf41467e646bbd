//! Form-boundary parsing.
//!
//! Bulk submissions arrive as flat string key/value pairs with the month
//! (or liability id) embedded in the key. Everything string-shaped is
//! resolved here into explicit typed maps so the reconciliation engine
//! never parses a key. Blank values mean "no change"; malformed values
//! are collected as per-field errors while the rest of the batch
//! proceeds.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use kazi_core::finance::MonthlySummary;
use kazi_core::ids::LiabilityId;
use kazi_core::month::MonthKey;

/// A value that failed to parse; the batch continues without it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub key: String,
    pub detail: String,
}

/// The editable columns of a monthly summary, as named in bulk forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SummaryField {
    SalesZeroRated,
    SalesExempt,
    SalesVatable16,
    SalesVatable8,
    OutputVat16,
    OutputVat8,
    PurchasesZeroRated,
    PurchasesExempt,
    PurchasesVatable16,
    PurchasesVatable8,
    InputVat16,
    InputVat8,
    WithheldVat,
    BalanceBf,
    Paid,
}

impl SummaryField {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sales_zero_rated" => Self::SalesZeroRated,
            "sales_exempt" => Self::SalesExempt,
            "sales_vatable_16" => Self::SalesVatable16,
            "sales_vatable_8" => Self::SalesVatable8,
            "output_vat_16" => Self::OutputVat16,
            "output_vat_8" => Self::OutputVat8,
            "purchases_zero_rated" => Self::PurchasesZeroRated,
            "purchases_exempt" => Self::PurchasesExempt,
            "purchases_vatable_16" => Self::PurchasesVatable16,
            "purchases_vatable_8" => Self::PurchasesVatable8,
            "input_vat_16" => Self::InputVat16,
            "input_vat_8" => Self::InputVat8,
            "withheld_vat" => Self::WithheldVat,
            "balance_bf" => Self::BalanceBf,
            "paid" => Self::Paid,
            _ => None?,
        })
    }

    pub fn set(self, summary: &mut MonthlySummary, value: Decimal) {
        match self {
            Self::SalesZeroRated => summary.sales_zero_rated = value,
            Self::SalesExempt => summary.sales_exempt = value,
            Self::SalesVatable16 => summary.sales_vatable_16 = value,
            Self::SalesVatable8 => summary.sales_vatable_8 = value,
            Self::OutputVat16 => summary.output_vat_16 = value,
            Self::OutputVat8 => summary.output_vat_8 = value,
            Self::PurchasesZeroRated => summary.purchases_zero_rated = value,
            Self::PurchasesExempt => summary.purchases_exempt = value,
            Self::PurchasesVatable16 => summary.purchases_vatable_16 = value,
            Self::PurchasesVatable8 => summary.purchases_vatable_8 = value,
            Self::InputVat16 => summary.input_vat_16 = value,
            Self::InputVat8 => summary.input_vat_8 = value,
            Self::WithheldVat => summary.withheld_vat = value,
            Self::BalanceBf => summary.balance_bf = value,
            Self::Paid => summary.paid = value,
        }
    }
}

/// Typed result of a historical-bulk submission: per-month field values.
pub type SummaryDeltas = BTreeMap<MonthKey, BTreeMap<SummaryField, Decimal>>;

fn parse_decimal(key: &str, value: &str, errors: &mut Vec<FieldError>) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.replace(',', "").parse() {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push(FieldError {
                key: key.to_owned(),
                detail: format!("not a decimal: {trimmed}"),
            });
            None
        }
    }
}

/// Accepted truthy spellings for checkbox-style fields.
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// Parse `<field>_<MONTH-ABBR>` keys into per-month deltas. Unknown keys
/// are ignored (the form carries unrelated inputs too).
pub fn parse_summary_bulk(pairs: &[(String, String)]) -> (SummaryDeltas, Vec<FieldError>) {
    let mut deltas: SummaryDeltas = BTreeMap::new();
    let mut errors = Vec::new();

    for (key, value) in pairs {
        let Some((field_name, month_raw)) = key.rsplit_once('_') else {
            continue;
        };
        let Ok(month) = month_raw.parse::<MonthKey>() else {
            continue;
        };
        // Guard against 3-letter prefixes of longer words matching a month.
        if month_raw.len() != 3 {
            continue;
        }
        let Some(field) = SummaryField::from_name(field_name) else {
            continue;
        };
        if let Some(d) = parse_decimal(key, value, &mut errors) {
            deltas.entry(month).or_default().insert(field, d);
        }
    }

    (deltas, errors)
}

/// The current-period path sets `paid` from a `paid_<MONTH>` key.
pub fn parse_paid(pairs: &[(String, String)], month: MonthKey) -> (Option<Decimal>, Vec<FieldError>) {
    let key = format!("paid_{}", month.as_str());
    let mut errors = Vec::new();
    let value = pairs
        .iter()
        .find(|(k, _)| *k == key)
        .and_then(|(k, v)| parse_decimal(k, v, &mut errors));
    (value, errors)
}

/// `<prefix>_<fieldname>_<ABBR>` keyed update-in-place values, e.g.
/// `bc_total_credits_SEP` or `gs_gross_salary_JAN`.
pub fn parse_month_keyed(
    pairs: &[(String, String)],
    prefix: &str,
) -> (BTreeMap<MonthKey, Decimal>, Vec<FieldError>) {
    let mut values = BTreeMap::new();
    let mut errors = Vec::new();
    let full_prefix = format!("{prefix}_");

    for (key, value) in pairs {
        let Some(rest) = key.strip_prefix(&full_prefix) else {
            continue;
        };
        let Some((_, month_raw)) = rest.rsplit_once('_').or(Some(("", rest))) else {
            continue;
        };
        if month_raw.len() != 3 {
            continue;
        }
        let Ok(month) = month_raw.parse::<MonthKey>() else {
            continue;
        };
        if let Some(d) = parse_decimal(key, value, &mut errors) {
            values.insert(month, d);
        }
    }

    (values, errors)
}

/// Per-quarter installment inputs: `installment_tax_<n>` amounts and
/// `installment_paid_<n>` flags.
pub fn parse_installment(
    pairs: &[(String, String)],
) -> ([Option<Decimal>; 4], [Option<bool>; 4], Vec<FieldError>) {
    let mut amounts = [None; 4];
    let mut paid = [None; 4];
    let mut errors = Vec::new();

    for (key, value) in pairs {
        for i in 0..4 {
            if *key == format!("installment_tax_{}", i + 1) {
                amounts[i] = parse_decimal(key, value, &mut errors);
            } else if *key == format!("installment_paid_{}", i + 1) {
                paid[i] = Some(truthy(value));
            }
        }
    }

    (amounts, paid, errors)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiabilityUpdate {
    pub period: Option<String>,
    pub tax_head: Option<String>,
    pub principal: Option<Decimal>,
    pub penalty: Option<Decimal>,
    pub interest: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewLiability {
    pub period: String,
    pub tax_head: String,
    pub principal: Decimal,
    pub penalty: Decimal,
    pub interest: Decimal,
}

/// One batch submission for an engagement's tax liabilities.
#[derive(Debug, Default)]
pub struct LiabilityBatch {
    pub deletes: Vec<LiabilityId>,
    pub updates: BTreeMap<String, LiabilityUpdate>,
    pub creates: Vec<NewLiability>,
    pub errors: Vec<FieldError>,
}

/// Parse `tl_delete_<id>` markers, `tl_<field>_<id>` updates, and both the
/// flat `new_tl_*` and parallel-array `new_tl_*[]` creation forms.
pub fn parse_liability_batch(pairs: &[(String, String)]) -> LiabilityBatch {
    let mut batch = LiabilityBatch::default();

    let mut new_periods = Vec::new();
    let mut new_heads = Vec::new();
    let mut new_principals = Vec::new();
    let mut new_penalties = Vec::new();
    let mut new_interests = Vec::new();

    for (key, value) in pairs {
        if let Some(id) = key.strip_prefix("tl_delete_") {
            if truthy(value) {
                batch.deletes.push(LiabilityId::from_raw(id));
            }
        } else if let Some(id) = key.strip_prefix("tl_period_") {
            batch.updates.entry(id.to_owned()).or_default().period = Some(value.clone());
        } else if let Some(id) = key.strip_prefix("tl_tax_head_") {
            batch.updates.entry(id.to_owned()).or_default().tax_head = Some(value.clone());
        } else if let Some(id) = key.strip_prefix("tl_principal_") {
            let d = parse_decimal(key, value, &mut batch.errors);
            batch.updates.entry(id.to_owned()).or_default().principal = d;
        } else if let Some(id) = key.strip_prefix("tl_penalty_") {
            let d = parse_decimal(key, value, &mut batch.errors);
            batch.updates.entry(id.to_owned()).or_default().penalty = d;
        } else if let Some(id) = key.strip_prefix("tl_interest_") {
            let d = parse_decimal(key, value, &mut batch.errors);
            batch.updates.entry(id.to_owned()).or_default().interest = d;
        } else if key == "new_tl_period" || key == "new_tl_period[]" {
            new_periods.push(value.clone());
        } else if key == "new_tl_tax_head" || key == "new_tl_tax_head[]" {
            new_heads.push(value.clone());
        } else if key == "new_tl_principal" || key == "new_tl_principal[]" {
            new_principals.push(parse_decimal(key, value, &mut batch.errors));
        } else if key == "new_tl_penalty" || key == "new_tl_penalty[]" {
            new_penalties.push(parse_decimal(key, value, &mut batch.errors));
        } else if key == "new_tl_interest" || key == "new_tl_interest[]" {
            new_interests.push(parse_decimal(key, value, &mut batch.errors));
        }
    }

    // Index-aligned across all arrays; a record is created only when its
    // period is non-blank at that index.
    for (i, period) in new_periods.iter().enumerate() {
        if period.trim().is_empty() {
            continue;
        }
        batch.creates.push(NewLiability {
            period: period.trim().to_owned(),
            tax_head: new_heads.get(i).map(|s| s.trim().to_owned()).unwrap_or_default(),
            principal: new_principals.get(i).copied().flatten().unwrap_or_default(),
            penalty: new_penalties.get(i).copied().flatten().unwrap_or_default(),
            interest: new_interests.get(i).copied().flatten().unwrap_or_default(),
        });
    }

    // Deleted ids never receive field updates.
    for id in &batch.deletes {
        batch.updates.remove(id.as_str());
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn bulk_summary_groups_by_month() {
        let (deltas, errors) = parse_summary_bulk(&pairs(&[
            ("sales_vatable_16_SEP", "1000.50"),
            ("paid_SEP", "200"),
            ("balance_bf_OCT", "75"),
            ("unrelated_key", "9"),
        ]));
        assert!(errors.is_empty());
        assert_eq!(deltas.len(), 2);
        assert_eq!(
            deltas[&MonthKey::Sep][&SummaryField::SalesVatable16],
            Decimal::new(100050, 2)
        );
        assert_eq!(deltas[&MonthKey::Sep][&SummaryField::Paid], Decimal::from(200));
        assert_eq!(deltas[&MonthKey::Oct][&SummaryField::BalanceBf], Decimal::from(75));
    }

    #[test]
    fn malformed_value_collected_batch_continues() {
        let (deltas, errors) = parse_summary_bulk(&pairs(&[
            ("sales_exempt_JAN", "abc"),
            ("sales_exempt_FEB", "10"),
        ]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "sales_exempt_JAN");
        assert_eq!(deltas.len(), 1);
        assert!(deltas.contains_key(&MonthKey::Feb));
    }

    #[test]
    fn blank_value_is_no_change() {
        let (deltas, errors) = parse_summary_bulk(&pairs(&[("paid_MAR", "  ")]));
        assert!(deltas.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn thousands_separators_accepted() {
        let (deltas, errors) = parse_summary_bulk(&pairs(&[("withheld_vat_DEC", "1,234.56")]));
        assert!(errors.is_empty());
        assert_eq!(
            deltas[&MonthKey::Dec][&SummaryField::WithheldVat],
            Decimal::new(123456, 2)
        );
    }

    #[test]
    fn paid_key_for_current_month() {
        let p = pairs(&[("paid_SEP", "120"), ("paid_OCT", "999")]);
        let (value, errors) = parse_paid(&p, MonthKey::Sep);
        assert!(errors.is_empty());
        assert_eq!(value, Some(Decimal::from(120)));

        let (missing, _) = parse_paid(&p, MonthKey::Jan);
        assert!(missing.is_none());
    }

    #[test]
    fn banking_and_salary_prefixes() {
        let p = pairs(&[
            ("bc_total_credits_SEP", "11600"),
            ("gs_gross_salary_SEP", "250000"),
            ("bc_total_credits_BAD", "5"),
        ]);
        let (banking, errors) = parse_month_keyed(&p, "bc_total_credits");
        assert!(errors.is_empty());
        assert_eq!(banking.len(), 1);
        assert_eq!(banking[&MonthKey::Sep], Decimal::from(11600));

        let (salary, _) = parse_month_keyed(&p, "gs_gross_salary");
        assert_eq!(salary[&MonthKey::Sep], Decimal::from(250000));
    }

    #[test]
    fn installment_pairs() {
        let (amounts, paid, errors) = parse_installment(&pairs(&[
            ("installment_tax_1", "100"),
            ("installment_paid_1", "true"),
            ("installment_tax_3", "bad"),
            ("installment_paid_4", "no"),
        ]));
        assert_eq!(amounts[0], Some(Decimal::from(100)));
        assert_eq!(paid[0], Some(true));
        assert!(amounts[2].is_none());
        assert_eq!(paid[3], Some(false));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn truthy_forms() {
        for v in ["true", "TRUE", "on", "1", "yes", " Yes "] {
            assert!(truthy(v), "{v}");
        }
        for v in ["false", "0", "off", "no", ""] {
            assert!(!truthy(v), "{v}");
        }
    }

    #[test]
    fn liability_deletes_win_over_updates() {
        let batch = parse_liability_batch(&pairs(&[
            ("tl_delete_tl_1", "on"),
            ("tl_principal_tl_1", "500"),
            ("tl_principal_tl_2", "700"),
        ]));
        assert_eq!(batch.deletes, vec![LiabilityId::from_raw("tl_1")]);
        assert!(!batch.updates.contains_key("tl_1"));
        assert_eq!(batch.updates["tl_2"].principal, Some(Decimal::from(700)));
    }

    #[test]
    fn falsey_delete_marker_ignored() {
        let batch = parse_liability_batch(&pairs(&[("tl_delete_tl_1", "false")]));
        assert!(batch.deletes.is_empty());
    }

    #[test]
    fn flat_creation() {
        let batch = parse_liability_batch(&pairs(&[
            ("new_tl_period", "Q4 2024"),
            ("new_tl_tax_head", "PAYE"),
            ("new_tl_principal", "1000"),
            ("new_tl_penalty", "50"),
            ("new_tl_interest", "25"),
        ]));
        assert_eq!(batch.creates.len(), 1);
        let created = &batch.creates[0];
        assert_eq!(created.period, "Q4 2024");
        assert_eq!(created.tax_head, "PAYE");
        assert_eq!(created.principal, Decimal::from(1000));
    }

    #[test]
    fn parallel_array_creation_skips_blank_period() {
        let batch = parse_liability_batch(&pairs(&[
            ("new_tl_period[]", "Q1 2025"),
            ("new_tl_period[]", ""),
            ("new_tl_period[]", "Q3 2025"),
            ("new_tl_tax_head[]", "VAT"),
            ("new_tl_tax_head[]", "PAYE"),
            ("new_tl_tax_head[]", "NSSF"),
            ("new_tl_principal[]", "10"),
            ("new_tl_principal[]", "20"),
            ("new_tl_principal[]", "30"),
        ]));
        assert_eq!(batch.creates.len(), 2);
        assert_eq!(batch.creates[0].period, "Q1 2025");
        assert_eq!(batch.creates[0].tax_head, "VAT");
        assert_eq!(batch.creates[1].period, "Q3 2025");
        assert_eq!(batch.creates[1].tax_head, "NSSF");
        assert_eq!(batch.creates[1].principal, Decimal::from(30));
    }
}
