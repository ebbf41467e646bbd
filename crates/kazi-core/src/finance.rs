use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{EngagementId, LedgerId, LiabilityId};
use crate::month::{FilingPeriod, MonthKey};

/// Standard VAT rate (16%).
pub fn rate_16() -> Decimal {
    Decimal::new(16, 2)
}

/// Reduced VAT rate (8%).
pub fn rate_8() -> Decimal {
    Decimal::new(8, 2)
}

fn vat_at_rates(vatable_16: Decimal, vatable_8: Decimal) -> Decimal {
    vatable_16 * rate_16() + vatable_8 * rate_8()
}

/// Raw monthly tax-filing input record for one engagement and filing
/// period. Everything a user types lands here; the totals below are pure
/// functions over these fields and are never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodLedger {
    pub id: LedgerId,
    pub engagement: EngagementId,
    pub period: FilingPeriod,
    pub nature_of_business: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,

    pub reg_vatable_16: Decimal,
    pub reg_vatable_8: Decimal,
    pub reg_zero_rated: Decimal,
    pub reg_exempt: Decimal,

    pub non_reg_vatable_16: Decimal,
    pub non_reg_vatable_8: Decimal,
    pub non_reg_zero_rated: Decimal,
    pub non_reg_exempt: Decimal,

    pub purchases_vatable_16: Decimal,
    pub purchases_vatable_8: Decimal,
    pub purchases_zero_rated: Decimal,
    pub purchases_exempt: Decimal,

    pub vat_wh_credit: Decimal,
    pub credit_bf: Decimal,
    /// Manual correction escape hatch; when set, `vat_payable` returns it
    /// verbatim.
    pub vat_payable_override: Option<Decimal>,

    pub paye_employees: Option<u32>,
    pub paye_amount: Option<Decimal>,
    pub shif_employees: Option<u32>,
    pub shif_amount: Option<Decimal>,
    pub nssf_employees: Option<u32>,
    pub nssf_amount: Option<Decimal>,
}

impl PeriodLedger {
    pub fn new(engagement: EngagementId, period: FilingPeriod) -> Self {
        Self {
            id: LedgerId::new(),
            engagement,
            period,
            nature_of_business: None,
            comments: None,
            created_at: Utc::now(),
            reg_vatable_16: Decimal::ZERO,
            reg_vatable_8: Decimal::ZERO,
            reg_zero_rated: Decimal::ZERO,
            reg_exempt: Decimal::ZERO,
            non_reg_vatable_16: Decimal::ZERO,
            non_reg_vatable_8: Decimal::ZERO,
            non_reg_zero_rated: Decimal::ZERO,
            non_reg_exempt: Decimal::ZERO,
            purchases_vatable_16: Decimal::ZERO,
            purchases_vatable_8: Decimal::ZERO,
            purchases_zero_rated: Decimal::ZERO,
            purchases_exempt: Decimal::ZERO,
            vat_wh_credit: Decimal::ZERO,
            credit_bf: Decimal::ZERO,
            vat_payable_override: None,
            paye_employees: None,
            paye_amount: None,
            shif_employees: None,
            shif_amount: None,
            nssf_employees: None,
            nssf_amount: None,
        }
    }

    pub fn reg_customers_vat(&self) -> Decimal {
        vat_at_rates(self.reg_vatable_16, self.reg_vatable_8)
    }

    pub fn reg_customers_total(&self) -> Decimal {
        self.reg_vatable_16 + self.reg_vatable_8 + self.reg_zero_rated + self.reg_exempt
    }

    pub fn non_reg_customers_vat(&self) -> Decimal {
        vat_at_rates(self.non_reg_vatable_16, self.non_reg_vatable_8)
    }

    pub fn non_reg_customers_total(&self) -> Decimal {
        self.non_reg_vatable_16
            + self.non_reg_vatable_8
            + self.non_reg_zero_rated
            + self.non_reg_exempt
    }

    pub fn total_sales_vatable(&self) -> Decimal {
        self.reg_vatable_16 + self.reg_vatable_8 + self.non_reg_vatable_16 + self.non_reg_vatable_8
    }

    pub fn vat_on_sales(&self) -> Decimal {
        self.reg_customers_vat() + self.non_reg_customers_vat()
    }

    pub fn total_sales_zero_rated(&self) -> Decimal {
        self.reg_zero_rated + self.non_reg_zero_rated
    }

    pub fn total_sales_exempt(&self) -> Decimal {
        self.reg_exempt + self.non_reg_exempt
    }

    pub fn total_sales(&self) -> Decimal {
        self.reg_customers_total() + self.non_reg_customers_total()
    }

    pub fn purchases_vat(&self) -> Decimal {
        vat_at_rates(self.purchases_vatable_16, self.purchases_vatable_8)
    }

    pub fn purchases_total(&self) -> Decimal {
        self.purchases_vatable_16
            + self.purchases_vatable_8
            + self.purchases_zero_rated
            + self.purchases_exempt
    }

    /// Output VAT minus input VAT minus credits, unless overridden.
    pub fn vat_payable(&self) -> Decimal {
        if let Some(v) = self.vat_payable_override {
            return v;
        }
        self.vat_on_sales() - self.purchases_vat() - (self.vat_wh_credit + self.credit_bf)
    }
}

/// Denormalized per-calendar-month aggregate. One row per (engagement,
/// month abbreviation); `balance_cf` is recomputed on read, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub engagement: EngagementId,
    pub month: MonthKey,

    pub sales_zero_rated: Decimal,
    pub sales_exempt: Decimal,
    pub sales_vatable_16: Decimal,
    pub sales_vatable_8: Decimal,
    pub output_vat_16: Decimal,
    pub output_vat_8: Decimal,

    pub purchases_zero_rated: Decimal,
    pub purchases_exempt: Decimal,
    pub purchases_vatable_16: Decimal,
    pub purchases_vatable_8: Decimal,
    pub input_vat_16: Decimal,
    pub input_vat_8: Decimal,

    pub withheld_vat: Decimal,
    pub balance_bf: Decimal,
    pub paid: Decimal,
}

impl MonthlySummary {
    pub fn empty(engagement: EngagementId, month: MonthKey) -> Self {
        Self {
            engagement,
            month,
            sales_zero_rated: Decimal::ZERO,
            sales_exempt: Decimal::ZERO,
            sales_vatable_16: Decimal::ZERO,
            sales_vatable_8: Decimal::ZERO,
            output_vat_16: Decimal::ZERO,
            output_vat_8: Decimal::ZERO,
            purchases_zero_rated: Decimal::ZERO,
            purchases_exempt: Decimal::ZERO,
            purchases_vatable_16: Decimal::ZERO,
            purchases_vatable_8: Decimal::ZERO,
            input_vat_16: Decimal::ZERO,
            input_vat_8: Decimal::ZERO,
            withheld_vat: Decimal::ZERO,
            balance_bf: Decimal::ZERO,
            paid: Decimal::ZERO,
        }
    }

    pub fn total_sales(&self) -> Decimal {
        self.sales_zero_rated + self.sales_exempt + self.sales_vatable_16 + self.sales_vatable_8
    }

    pub fn total_output_vat(&self) -> Decimal {
        self.output_vat_16 + self.output_vat_8
    }

    pub fn total_purchases(&self) -> Decimal {
        self.purchases_zero_rated
            + self.purchases_exempt
            + self.purchases_vatable_16
            + self.purchases_vatable_8
    }

    pub fn total_input_vat(&self) -> Decimal {
        self.input_vat_16 + self.input_vat_8
    }

    /// Output VAT minus input VAT minus withheld VAT.
    pub fn net_vat(&self) -> Decimal {
        self.total_output_vat() - self.total_input_vat() - self.withheld_vat
    }

    /// Balance carried forward. Always live: `balance_bf + net_vat - paid`.
    pub fn balance_cf(&self) -> Decimal {
        self.balance_bf + self.net_vat() - self.paid
    }
}

/// Per-month bank-credit totals. `net_credits` back-calculates the
/// VAT-exclusive amount from a VAT-inclusive credit total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankingSummary {
    pub engagement: EngagementId,
    pub month: MonthKey,
    pub total_credits: Decimal,
}

impl BankingSummary {
    pub fn empty(engagement: EngagementId, month: MonthKey) -> Self {
        Self {
            engagement,
            month,
            total_credits: Decimal::ZERO,
        }
    }

    /// `100/116 × total_credits`.
    pub fn net_credits(&self) -> Decimal {
        Decimal::from(100) / Decimal::from(116) * self.total_credits
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalarySummary {
    pub engagement: EngagementId,
    pub month: MonthKey,
    pub gross_salary: Decimal,
}

impl SalarySummary {
    pub fn empty(engagement: EngagementId, month: MonthKey) -> Self {
        Self {
            engagement,
            month,
            gross_salary: Decimal::ZERO,
        }
    }
}

/// Single record per engagement: four independent quarterly installments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallmentTax {
    pub engagement: EngagementId,
    pub amounts: [Decimal; 4],
    pub paid: [bool; 4],
}

impl InstallmentTax {
    pub fn empty(engagement: EngagementId) -> Self {
        Self {
            engagement,
            amounts: [Decimal::ZERO; 4],
            paid: [false; 4],
        }
    }

    pub fn total(&self) -> Decimal {
        self.amounts.iter().copied().sum()
    }
}

/// An outstanding revenue-authority liability line (e.g. "Q4 2024" PAYE).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLiability {
    pub id: LiabilityId,
    pub engagement: EngagementId,
    pub period: String,
    pub tax_head: String,
    pub principal: Decimal,
    pub penalty: Decimal,
    pub interest: Decimal,
}

impl TaxLiability {
    pub fn new(engagement: EngagementId, period: impl Into<String>) -> Self {
        Self {
            id: LiabilityId::new(),
            engagement,
            period: period.into(),
            tax_head: String::new(),
            principal: Decimal::ZERO,
            penalty: Decimal::ZERO,
            interest: Decimal::ZERO,
        }
    }

    pub fn total(&self) -> Decimal {
        self.principal + self.penalty + self.interest
    }
}

/// Year-to-date accumulator for the engagement dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub sales: Decimal,
    pub output_vat: Decimal,
    pub purchases: Decimal,
    pub input_vat: Decimal,
    pub net_vat: Decimal,
    pub paid: Decimal,
}

impl SummaryTotals {
    pub fn accumulate(&mut self, summary: &MonthlySummary) {
        self.sales += summary.total_sales();
        self.output_vat += summary.total_output_vat();
        self.purchases += summary.total_purchases();
        self.input_vat += summary.total_input_vat();
        self.net_vat += summary.net_vat();
        self.paid += summary.paid;
    }
}
