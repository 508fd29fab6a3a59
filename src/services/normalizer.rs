use crate::database::models::{Minutes, OvertimePolicy};

/// Which allowance swallows small positive deviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcessBand {
    /// `policy.tolerance_minutes`: daily candidates and weekly totals.
    Tolerance,
    /// `policy.excess_grace_minutes`: minutes typed in by an approver.
    ExcessGrace,
}

/// Round to the nearest multiple of `increment`, ties away from zero.
pub fn round_to_increment(raw: Minutes, increment: Minutes) -> Minutes {
    let increment = i64::from(increment.value().max(1));
    let raw = i64::from(raw.value());
    let magnitude = raw.abs();
    let rounded = (magnitude + increment / 2) / increment * increment;
    let signed = if raw < 0 { -rounded } else { rounded };
    Minutes(signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

/// Turn a raw worked-minus-expected deviation into the amount that counts.
///
/// Rounds to the policy increment, then drops positive values within the
/// chosen excess band and negative values within the deficit grace. A value
/// is inside a band when either the raw or the rounded amount is, so rounding
/// can never push a tolerated deviation over its allowance. The result is
/// always 0 or a multiple of the increment, and normalizing twice gives the
/// same answer as normalizing once.
pub fn normalize(raw: Minutes, policy: &OvertimePolicy, band: ExcessBand) -> Minutes {
    let rounded = round_to_increment(raw, policy.rounding_increment_minutes);

    let excess_allowance = match band {
        ExcessBand::Tolerance => policy.tolerance_minutes,
        ExcessBand::ExcessGrace => policy.excess_grace_minutes,
    };
    let within_excess = |m: Minutes| m.is_positive() && m <= excess_allowance;
    let within_deficit = |m: Minutes| m.is_negative() && m.abs() <= policy.deficit_grace_minutes;

    if within_excess(raw) || within_excess(rounded) {
        return Minutes::ZERO;
    }
    if within_deficit(raw) || within_deficit(rounded) {
        return Minutes::ZERO;
    }
    rounded
}
