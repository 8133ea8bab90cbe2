//! Banking profitability functions: interest income, balances, servicing and
//! risk costs, funding and reserve costs, product expenses.

use std::sync::Arc;

use ledgermash_common::EvalError;

use crate::clock::months_until;
use crate::function::{
    ArgValue, FnCaps, Function, FunctionContext, ParamSpec, number_arg, optional_number,
};
use crate::library::Library;

pub const LIBRARY_NAME: &str = "financial";

pub const RATES_BY_TERM: &str = "ratesByTerm";
pub const PRODUCT_EXPENSE_RATES: &str = "productExpenseRates";

/// Months an average balance is taken over when neither maturity nor term is known.
const DEFAULT_MONTHS: f64 = 12.0;

/// Longest loan life averaged over (100 years); longer is `#NUM!`.
const MAX_MONTHS: f64 = 1200.0;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Remaining life in months: maturity date against `now`, else a non-zero
/// term, else a year.
fn remaining_months(maturity: &ArgValue, term: Option<f64>, ctx: &dyn FunctionContext) -> f64 {
    if let Some(date) = maturity.as_date() {
        return months_until(date, ctx.now()) as f64;
    }
    match term {
        Some(t) if t != 0.0 => t,
        _ => DEFAULT_MONTHS,
    }
}

/// Interest earned on a loan: `principal * rate`.
#[derive(Debug)]
pub struct InterestIncomeFn;

impl Function for InterestIncomeFn {
    fn name(&self) -> &'static str {
        "interestIncome"
    }
    fn description(&self) -> &'static str {
        "Interest earned: principal * rate"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("principal"), ParamSpec::number("rate")];
        P
    }
    fn eval(&self, args: &[ArgValue], _ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let p = self.params();
        Ok(number_arg(args, 0, &p[0])? * number_arg(args, 1, &p[1])?)
    }
}

/// Average outstanding balance of an amortising loan over its remaining life.
///
/// # Remarks
/// - The life is the calendar months from the run's `now` to `maturity`; when
///   the maturity is missing or not a date, `term` is used; failing both, 12.
/// - The balance starts at `principal` and drops by `payment` each month,
///   never below zero. The month-start balances are averaged and rounded to
///   cents.
/// - Returns `#NUM!` when the life is zero or negative (already matured) or
///   longer than 1200 months.
#[derive(Debug)]
pub struct AverageBalanceFn;

impl Function for AverageBalanceFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::CLOCK
    }
    fn name(&self) -> &'static str {
        "averageBalance"
    }
    fn description(&self) -> &'static str {
        "Average balance of an amortising loan until maturity"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[
            ParamSpec::number("principal"),
            ParamSpec::number("payment"),
            ParamSpec::date("maturity").optional(),
            ParamSpec::number("term").optional(),
        ];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let p = self.params();
        let principal = number_arg(args, 0, &p[0])?;
        let payment = number_arg(args, 1, &p[1])?;
        let maturity = args.get(2).unwrap_or(&ArgValue::Absent);
        let months = remaining_months(maturity, optional_number(args, 3), ctx);
        if months <= 0.0 {
            return Err(EvalError::new_num()
                .with_message(format!("no months remaining (got {months})")));
        }
        if !months.is_finite() || months > MAX_MONTHS {
            return Err(EvalError::new_num()
                .with_message(format!("loan life of {months} months exceeds {MAX_MONTHS}")));
        }

        let periods = months.ceil() as u32;
        let mut balance = principal;
        let mut total = 0.0;
        for month in 0..periods {
            let next = (balance - payment).max(0.0);
            if next == balance {
                // paid off or not amortising: the rest of the schedule is flat
                total += balance * f64::from(periods - month);
                break;
            }
            total += balance;
            balance = next;
        }
        Ok(round2(total / months))
    }
}

/// Cost of servicing a loan: `principal * loanServicingFactor`.
#[derive(Debug)]
pub struct ServicingCostFn;

impl Function for ServicingCostFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES
    }
    fn name(&self) -> &'static str {
        "servicingCost"
    }
    fn description(&self) -> &'static str {
        "Loan servicing cost: principal * loanServicingFactor"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("principal")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        Ok(number_arg(args, 0, &self.params()[0])? * ctx.attribute("loanServicingFactor")?)
    }
}

#[derive(Debug)]
pub struct OperatingRiskFn;

impl Function for OperatingRiskFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES
    }
    fn name(&self) -> &'static str {
        "operatingRisk"
    }
    fn description(&self) -> &'static str {
        "Operating risk charge: balance * minOperatingRisk"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("balance")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        Ok(number_arg(args, 0, &self.params()[0])? * ctx.attribute("minOperatingRisk")?)
    }
}

/// Percentage chance of default for the record's risk rating.
///
/// The rating is looked up on the probability curve of the column `risk`
/// resolved to. Blank ratings and ratings the curve does not list count as
/// 0%. A rating column without a curve (too few or too many distinct
/// values) is `#CONFIG!`.
#[derive(Debug)]
pub struct RiskProbabilityFn;

impl Function for RiskProbabilityFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::PROFILES
    }
    fn name(&self) -> &'static str {
        "riskProbability"
    }
    fn description(&self) -> &'static str {
        "Default probability (%) of the risk rating, from the rating column's curve"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::any("risk")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let Some(key) = args.first().and_then(ArgValue::lookup_key) else {
            return Ok(0.0);
        };
        let curve = ctx
            .param_profile(0)
            .and_then(|p| p.curve.as_ref())
            .ok_or_else(|| {
                EvalError::new_config()
                    .with_message("risk column has no probability curve")
            })?;
        Ok(curve.probability(&key).unwrap_or(0.0))
    }
}

/// Expected credit loss: `principal * p(risk)/100 * (1 - defaultRecoveryPerc)`.
#[derive(Debug)]
pub struct ExpectedLossFn;

impl Function for ExpectedLossFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES | FnCaps::PROFILES | FnCaps::CALLS
    }
    fn name(&self) -> &'static str {
        "expectedLoss"
    }
    fn description(&self) -> &'static str {
        "Expected loss: principal * riskProbability / 100 * (1 - defaultRecoveryPerc)"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("principal"), ParamSpec::any("risk")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let principal = number_arg(args, 0, &self.params()[0])?;
        let risk = args.get(1).cloned().unwrap_or(ArgValue::Absent);
        let probability = ctx.call("riskProbability", &[risk])?;
        let recovery = ctx.attribute("defaultRecoveryPerc")?;
        Ok(principal * probability / 100.0 * (1.0 - recovery))
    }
}

/// Scales a period-to-date amount to a year using the column's name
/// (`...mtd` → ×12, `...day`/`...daily` → ×365).
#[derive(Debug)]
pub struct AnnualizedFn;

impl Function for AnnualizedFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::PROFILES
    }
    fn name(&self) -> &'static str {
        "annualized"
    }
    fn description(&self) -> &'static str {
        "Amount scaled to a year by the amount column's ytd factor"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("amount")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let amount = number_arg(args, 0, &self.params()[0])?;
        let factor = ctx.param_profile(0).map_or(1.0, |p| p.ytd_factor);
        Ok(amount * factor)
    }
}

#[derive(Debug)]
pub struct TransactionCostFn;

impl Function for TransactionCostFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES
    }
    fn name(&self) -> &'static str {
        "transactionCost"
    }
    fn description(&self) -> &'static str {
        "Teller cost: deposits * depositUnitCost + withdrawals * withdrawalUnitCost"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[
            ParamSpec::number("deposits").optional(),
            ParamSpec::number("withdrawals").optional(),
        ];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let deposits = optional_number(args, 0).unwrap_or(0.0);
        let withdrawals = optional_number(args, 1).unwrap_or(0.0);
        Ok(deposits * ctx.attribute("depositUnitCost")?
            + withdrawals * ctx.attribute("withdrawalUnitCost")?)
    }
}

/// Opportunity cost of the reserve held against a demand deposit:
/// `balance * ddaReserveRequired * ratesByTerm(term)`, term defaulting to 1.
#[derive(Debug)]
pub struct ReserveCostFn;

impl Function for ReserveCostFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES | FnCaps::TABLES
    }
    fn name(&self) -> &'static str {
        "reserveCost"
    }
    fn description(&self) -> &'static str {
        "Reserve cost: balance * ddaReserveRequired * ratesByTerm(term or 1)"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[
            ParamSpec::number("balance"),
            ParamSpec::number("term").optional(),
        ];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let balance = number_arg(args, 0, &self.params()[0])?;
        let term = optional_number(args, 1).unwrap_or(1.0);
        Ok(balance * ctx.attribute("ddaReserveRequired")? * ctx.table_lookup(RATES_BY_TERM, term)?)
    }
}

/// Funding cost of a loan: its average balance times the rate for its term
/// (12 months when unknown).
#[derive(Debug)]
pub struct FundingCostFn;

impl Function for FundingCostFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::TABLES | FnCaps::CALLS | FnCaps::CLOCK
    }
    fn name(&self) -> &'static str {
        "fundingCost"
    }
    fn description(&self) -> &'static str {
        "Funding cost: averageBalance * ratesByTerm(term or 12)"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[
            ParamSpec::number("principal"),
            ParamSpec::number("payment"),
            ParamSpec::date("maturity").optional(),
            ParamSpec::number("term").optional(),
        ];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let average = ctx.call("averageBalance", args)?;
        let term = optional_number(args, 3).unwrap_or(DEFAULT_MONTHS);
        Ok(average * ctx.table_lookup(RATES_BY_TERM, term)?)
    }
}

#[derive(Debug)]
pub struct SavingsExpenseFn;

impl Function for SavingsExpenseFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES
    }
    fn name(&self) -> &'static str {
        "savingsExpense"
    }
    fn description(&self) -> &'static str {
        "Savings account upkeep: savingsAnnualExpense * months / 12"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::number("months").optional()];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let months = optional_number(args, 0).unwrap_or(DEFAULT_MONTHS);
        Ok(ctx.attribute("savingsAnnualExpense")? * months / DEFAULT_MONTHS)
    }
}

/// Product-specific expense: `balance * productExpenseRates[product]`.
#[derive(Debug)]
pub struct ProductExpenseFn;

impl Function for ProductExpenseFn {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE | FnCaps::ATTRIBUTES
    }
    fn name(&self) -> &'static str {
        "productExpense"
    }
    fn description(&self) -> &'static str {
        "Product expense: balance * productExpenseRates[product]"
    }
    fn params(&self) -> &'static [ParamSpec] {
        const P: &[ParamSpec] = &[ParamSpec::text("product"), ParamSpec::number("balance")];
        P
    }
    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError> {
        let p = self.params();
        let Some(product) = args.first().and_then(ArgValue::lookup_key) else {
            return Ok(0.0);
        };
        let balance = number_arg(args, 1, &p[1])?;
        Ok(balance * ctx.dictionary_value(PRODUCT_EXPENSE_RATES, &product)?)
    }
}

/// The `financial` library with its default attributes and dictionaries.
/// `ratesByTerm` must be supplied separately.
pub fn library() -> Library {
    Library::new(LIBRARY_NAME)
        .with_description("Account and loan profitability")
        .with_function(Arc::new(InterestIncomeFn))
        .with_function(Arc::new(AverageBalanceFn))
        .with_function(Arc::new(ServicingCostFn))
        .with_function(Arc::new(OperatingRiskFn))
        .with_function(Arc::new(ExpectedLossFn))
        .with_function(Arc::new(RiskProbabilityFn))
        .with_function(Arc::new(AnnualizedFn))
        .with_function(Arc::new(TransactionCostFn))
        .with_function(Arc::new(ReserveCostFn))
        .with_function(Arc::new(FundingCostFn))
        .with_function(Arc::new(SavingsExpenseFn))
        .with_function(Arc::new(ProductExpenseFn))
        .with_attribute(
            "loanServicingFactor",
            "Servicing cost per unit of principal",
            0.0025,
        )
        .with_attribute(
            "defaultRecoveryPerc",
            "Share of a defaulted principal recovered",
            0.50,
        )
        .with_attribute(
            "minOperatingRisk",
            "Operating risk charge per unit of balance",
            0.0015,
        )
        .with_attribute("depositUnitCost", "Cost of one deposit", 2.0)
        .with_attribute("withdrawalUnitCost", "Cost of one withdrawal", 0.11)
        .with_attribute(
            "ddaReserveRequired",
            "Reserve requirement on demand deposits",
            0.10,
        )
        .with_attribute(
            "savingsAnnualExpense",
            "Yearly upkeep of a savings account",
            28.0,
        )
        .with_dictionary(
            PRODUCT_EXPENSE_RATES,
            [("DDA", 0.012), ("SAV", 0.008), ("CD", 0.004), ("LOAN", 0.006)],
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{Analytics, compute_analytics};
    use crate::context::RunContext;
    use crate::library::{LibrarySet, LookupTable};
    use crate::translate::{FieldTranslator, HeaderIndex};
    use chrono::{NaiveDate, NaiveDateTime};
    use ledgermash_common::{CurvePolicy, EvalErrorKind, FieldValue, Source, SourceSet};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn run_with(library: Library, analytics: Analytics) -> RunContext {
        RunContext::new(
            LibrarySet::new().with_library(library),
            analytics,
            FieldTranslator::new(),
            now(),
        )
    }

    fn call(run: &RunContext, name: &str, args: &[ArgValue]) -> Result<f64, EvalError> {
        call_in(run, name, args, "loan", &[])
    }

    fn call_in(
        run: &RunContext,
        name: &str,
        args: &[ArgValue],
        source: &str,
        headers: &[String],
    ) -> Result<f64, EvalError> {
        let (lib, f) = run.libraries().find_function(name).unwrap();
        let index = HeaderIndex::new(headers);
        run.invoke(lib, f.as_ref(), args, source, &index)
    }

    fn n(v: f64) -> ArgValue {
        ArgValue::Number(v)
    }

    #[test]
    fn simple_products() {
        let run = run_with(library(), Analytics::default());
        assert_eq!(call(&run, "interestIncome", &[n(1000.0), n(0.05)]), Ok(50.0));
        assert!((call(&run, "servicingCost", &[n(1000.0)]).unwrap() - 2.5).abs() < 1e-12);
        assert!((call(&run, "operatingRisk", &[n(1000.0)]).unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(call(&run, "transactionCost", &[n(3.0)]), Ok(6.0));
        assert_eq!(call(&run, "savingsExpense", &[]), Ok(28.0));
        assert_eq!(call(&run, "savingsExpense", &[n(6.0)]), Ok(14.0));
        // absent numbers count as zero, text does not
        assert_eq!(call(&run, "interestIncome", &[n(1000.0)]), Ok(0.0));
        assert_eq!(
            call(&run, "interestIncome", &[n(1000.0), ArgValue::Text("prime".into())])
                .unwrap_err()
                .kind,
            EvalErrorKind::Value
        );
    }

    #[test]
    fn average_balance_walks_the_schedule() {
        let run = run_with(library(), Analytics::default());
        // 12 months by default: 1000, 900, ..., 100, 0, 0 → 5500 / 12
        let avg = call(&run, "averageBalance", &[n(1000.0), n(100.0)]).unwrap();
        assert_eq!(avg, 458.33);
        // explicit term
        let avg = call(
            &run,
            "averageBalance",
            &[n(1000.0), n(250.0), ArgValue::Absent, n(4.0)],
        )
        .unwrap();
        assert_eq!(avg, 625.0);
        // maturity three calendar months away wins over term
        let maturity = ArgValue::Date(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        let avg = call(&run, "averageBalance", &[n(300.0), n(100.0), maturity, n(24.0)]).unwrap();
        assert_eq!(avg, 200.0);
    }

    #[test]
    fn average_balance_rejects_absurd_terms() {
        let run = run_with(library(), Analytics::default());
        let err = call(
            &run,
            "averageBalance",
            &[n(1000.0), n(100.0), ArgValue::Absent, n(1e9)],
        )
        .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Num);
        assert!(err.message.unwrap().contains("1200"));

        // the longest accepted life with a flat balance averages to the principal
        let avg = call(
            &run,
            "averageBalance",
            &[n(1000.0), n(0.0), ArgValue::Absent, n(1200.0)],
        )
        .unwrap();
        assert_eq!(avg, 1000.0);
        // paid off early: 300, 200, 100 then 117 months at zero
        let avg = call(
            &run,
            "averageBalance",
            &[n(300.0), n(100.0), ArgValue::Absent, n(120.0)],
        )
        .unwrap();
        assert_eq!(avg, 5.0);
    }

    #[test]
    fn matured_loans_have_no_average() {
        let run = run_with(library(), Analytics::default());
        let past = ArgValue::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let err = call(&run, "averageBalance", &[n(1000.0), n(10.0), past]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Num);
    }

    #[test]
    fn rates_by_term_must_be_loaded() {
        let run = run_with(library(), Analytics::default());
        let err = call(&run, "reserveCost", &[n(1000.0)]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Config);

        let lib = library().with_table(
            RATES_BY_TERM,
            LookupTable::from_pairs([(1.0, 0.02), (12.0, 0.04), (36.0, 0.05)]),
        );
        let run = run_with(lib, Analytics::default());
        assert!((call(&run, "reserveCost", &[n(1000.0)]).unwrap() - 2.0).abs() < 1e-9);
        // 1200 / 12 per month over 12 months → average 650
        let cost = call(&run, "fundingCost", &[n(1200.0), n(100.0)]).unwrap();
        assert!((cost - 26.0).abs() < 1e-9);
    }

    #[test]
    fn product_expense_reads_the_dictionary() {
        let run = run_with(library(), Analytics::default());
        let dda = ArgValue::Text("DDA".into());
        assert!((call(&run, "productExpense", &[dda, n(1000.0)]).unwrap() - 12.0).abs() < 1e-9);
        let other = ArgValue::Text("IRA".into());
        assert_eq!(
            call(&run, "productExpense", &[other, n(1000.0)]).unwrap_err().kind,
            EvalErrorKind::Config
        );
    }

    #[test]
    fn risk_functions_use_the_rating_curve() {
        let mut src = Source::new("loan", vec!["Principal".into(), "RiskRating".into()]);
        for r in [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            src.push_row(vec![FieldValue::Number(1000.0), FieldValue::Number(r)]);
        }
        let headers = src.headers().to_vec();
        let analytics = compute_analytics(
            &SourceSet::new().with_source(src),
            &CurvePolicy::default(),
        );
        let run = run_with(library(), analytics);

        // mode 2 → pivot index 2: "1"→0, "2"→1, then 5..100 over four points
        let p = call_in(&run, "riskProbability", &[n(2.0)], "loan", &headers).unwrap();
        assert_eq!(p, 1.0);
        let p = call_in(&run, "riskProbability", &[n(6.0)], "loan", &headers).unwrap();
        assert_eq!(p, 100.0);
        let p = call_in(&run, "riskProbability", &[n(9.0)], "loan", &headers).unwrap();
        assert_eq!(p, 0.0);

        let loss = call_in(&run, "expectedLoss", &[n(1000.0), n(6.0)], "loan", &headers).unwrap();
        assert_eq!(loss, 500.0);

        // no profile for the rating column in another source
        let err = call_in(&run, "riskProbability", &[n(2.0)], "deposit", &headers).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Config);
    }

    #[test]
    fn annualized_uses_the_amount_column_name() {
        let src = Source::new("checking", vec!["FeesMtd".into()])
            .with_row([FieldValue::Number(10.0)])
            .with_row([FieldValue::Number(20.0)]);
        let headers = src.headers().to_vec();
        let analytics = compute_analytics(
            &SourceSet::new().with_source(src),
            &CurvePolicy::default(),
        );
        let run = run_with(library(), analytics);
        // the `amount` parameter does not translate to FeesMtd, so the factor is 1
        assert_eq!(
            call_in(&run, "annualized", &[n(10.0)], "checking", &headers),
            Ok(10.0)
        );

        let src = Source::new("checking", vec!["AmountMtd".into()])
            .with_row([FieldValue::Number(10.0)])
            .with_row([FieldValue::Number(20.0)]);
        let headers = src.headers().to_vec();
        let analytics = compute_analytics(
            &SourceSet::new().with_source(src),
            &CurvePolicy::default(),
        );
        let run = run_with(library(), analytics);
        assert_eq!(
            call_in(&run, "annualized", &[n(10.0)], "checking", &headers),
            Ok(120.0)
        );
    }

    #[test]
    fn every_function_declares_a_description() {
        for f in library().functions() {
            assert!(!f.description().is_empty(), "{}", f.name());
            assert!(f.caps().contains(FnCaps::PURE));
        }
    }
}
