use std::fmt::Display;

/// Totally ordered access level compared against a required minimum.
///
/// Plans and team roles are both tiers: a caller passes a gate when their
/// tier is greater than or equal to the tier the gate requires.
pub trait AccessTier: Copy + Ord + Display + Send + Sync + 'static {
    /// Name of the dimension used in denial reasons, e.g. `plan`.
    const DIMENSION: &'static str;

    /// Returns the lowest tier, used when nothing else is known.
    fn lowest() -> Self;

    /// Returns the stable storage value for this tier.
    fn as_str(&self) -> &'static str;

    /// Returns whether this tier meets the required minimum.
    fn satisfies(self, required: Self) -> bool {
        self >= required
    }

    /// Returns the human-readable reason for failing the required minimum.
    fn requirement_reason(required: Self) -> String {
        format!("Requires {} {}", required.as_str(), Self::DIMENSION)
    }
}
