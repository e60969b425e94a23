//! Exact integer splitting of a grain budget by real-valued weights.
//!
//! Weights are quantized to integer shares relative to the largest weight,
//! each receipt gets `floor(budget * share / total)`, and the leftover
//! units go one each to the largest fractional remainders. All arithmetic
//! is u128 with overflow checks.

use cred_core::constants::SHARE_PRECISION;
use cred_core::error::AllocationError;
use cred_core::grain::Grain;

/// Quantize weights into integer shares; the largest weight maps to
/// [`SHARE_PRECISION`].
pub(crate) fn quantize(weights: &[f64]) -> Result<Vec<u128>, AllocationError> {
    if let Some(index) = weights.iter().position(|w| !(w.is_finite() && *w >= 0.0)) {
        return Err(AllocationError::InvalidCred { index });
    }
    let max = weights.iter().copied().fold(0.0_f64, f64::max);
    if max == 0.0 {
        return Ok(vec![0; weights.len()]);
    }
    let precision = SHARE_PRECISION as f64;
    Ok(weights.iter().map(|w| ((w / max) * precision).round() as u128).collect())
}

/// `floor(value * share / total)` and its remainder, for `share <= total`.
pub(crate) fn mul_div(value: u128, share: u128, total: u128) -> Result<(u128, u128), AllocationError> {
    // value * share / total = (value / total) * share + (value % total) * share / total
    let whole = value / total;
    let carry = (value % total)
        .checked_mul(share)
        .ok_or(AllocationError::ArithmeticOverflow)?;
    // whole * share <= value, so it cannot overflow.
    Ok((whole * share + carry / total, carry % total))
}

/// Split `budget` proportionally to `weights`, conserving it exactly.
///
/// Receipts follow the order of `weights`. Remainder ties go to the
/// earlier entry. All-zero weights are only accepted with a zero budget.
pub fn split_budget(budget: Grain, weights: &[f64]) -> Result<Vec<Grain>, AllocationError> {
    let shares = quantize(weights)?;
    let total: u128 = shares
        .iter()
        .try_fold(0u128, |acc, &s| acc.checked_add(s))
        .ok_or(AllocationError::ArithmeticOverflow)?;
    if total == 0 {
        return if budget.is_zero() {
            Ok(vec![Grain::ZERO; weights.len()])
        } else {
            Err(AllocationError::CredIsZero)
        };
    }

    let mut amounts = Vec::with_capacity(shares.len());
    let mut fractions = Vec::with_capacity(shares.len());
    for &share in &shares {
        let (amount, fraction) = mul_div(budget.0, share, total)?;
        amounts.push(amount);
        fractions.push(fraction);
    }

    let assigned = amounts
        .iter()
        .try_fold(0u128, |acc, &a| acc.checked_add(a))
        .ok_or(AllocationError::ArithmeticOverflow)?;
    let leftover = budget.0 - assigned;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| fractions[b].cmp(&fractions[a]).then(a.cmp(&b)));
    for &i in order.iter().take(leftover as usize) {
        amounts[i] += 1;
    }

    Ok(amounts.into_iter().map(Grain).collect())
}
