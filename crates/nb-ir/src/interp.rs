//! Float helpers shared by the cursor resolver and drag gestures.

/// Linear interpolation between two values at position `t` (0.0..1.0).
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Half-ellipse grab-affinity bias for a horizontal position between two
/// pins. Zero at either pin, maximal (~0.207) midway, so that near a pin
/// the vertical bend estimate favors that pin's exact interval.
pub fn grab_arc(ratio: f32) -> f32 {
    let centered = ratio - 0.5;
    libm::sqrtf((0.5 - centered * centered).max(0.0)) - 0.5
}

/// Two-speed vertical drag sensitivity.
///
/// The first 8 accumulated counts move at the slow rate, anything beyond
/// at the fast rate; both rates scale inversely with the value cap so
/// wide-range lanes need proportionally less pointer travel.
pub fn drag_counts(pixel_delta: f32, cap: i32) -> f32 {
    let cap = cap.max(1) as f32;
    let slow = 25.0 / libm::powf(cap, 0.4);
    let fast = 22.0 / libm::powf(cap, 0.5);
    let delta = libm::fabsf(pixel_delta);
    (delta / slow).min(8.0) + (delta / fast - 8.0).max(0.0)
}

/// Round a real-valued part position to the nearest integer part.
pub fn round_to_part(value: f32) -> i32 {
    libm::roundf(value) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(-10.0, 10.0, 0.5), 0.0);
    }

    #[test]
    fn grab_arc_is_zero_at_pins() {
        assert!(grab_arc(0.0).abs() < 1e-6);
        assert!(grab_arc(1.0).abs() < 1e-6);
    }

    #[test]
    fn grab_arc_peaks_midway() {
        let mid = grab_arc(0.5);
        assert!((mid - 0.207).abs() < 0.01);
        assert!(mid > grab_arc(0.25));
        assert!(mid > grab_arc(0.75));
    }

    #[test]
    fn drag_counts_has_a_knee_at_eight() {
        // Below the knee only the slow rate contributes.
        let cap = 6;
        let slow = 25.0 / libm::powf(cap as f32, 0.4);
        let below = drag_counts(slow * 4.0, cap);
        assert!((below - 4.0).abs() < 1e-4);

        // Past the knee the fast term kicks in on top.
        let past = drag_counts(slow * 16.0, cap);
        assert!(past > 8.0);
    }

    #[test]
    fn drag_counts_scales_down_with_cap() {
        // Same pointer travel produces more counts on a wider cap.
        assert!(drag_counts(50.0, 100) > drag_counts(50.0, 6));
    }

    #[test]
    fn round_to_part_halves_round_up() {
        assert_eq!(round_to_part(3.5), 4);
        assert_eq!(round_to_part(3.4), 3);
        assert_eq!(round_to_part(-0.6), -1);
    }
}
