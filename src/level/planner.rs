//! Segment planning
//!
//! Turns a level request into a [`LevelPlan`] and an ordered, linked list of
//! segments. Each segment's layout draws come from its own layout stream, so
//! any segment can be re-planned in isolation.

use glam::Quat;

use super::difficulty::DifficultyCurve;
use super::seed::{SEED_MIX_VERSION, SeedStream, SegmentRng, derive_level_seed, derive_segment_seed};
use super::segment::{LevelPlan, LevelRequest, Pose, Segment, SegmentType};
use crate::consts::*;
use crate::error::Diagnostic;
use crate::lerp;
use crate::settings::GenerationSettings;

/// Output of [`plan`]
#[derive(Debug, Clone)]
pub struct PlannedLevel {
    pub plan: LevelPlan,
    pub segments: Vec<Segment>,
    /// Settings after clamping
    pub settings: GenerationSettings,
    /// Config problems clamped while planning
    pub diagnostics: Vec<Diagnostic>,
}

/// Cumulative thresholds for special segment types
const SPECIAL_TYPES: [(f32, SegmentType); 7] = [
    (0.20, SegmentType::Curve),
    (0.35, SegmentType::Uphill),
    (0.50, SegmentType::Downhill),
    (0.62, SegmentType::Jump),
    (0.75, SegmentType::Narrow),
    (0.87, SegmentType::Wide),
    (1.00, SegmentType::Hazard),
];

/// `clamp(length / segment_length, min, max)`; non-positive lengths give `min`
pub fn segment_count(length_m: f32, segment_length: f32, min_segments: u32, max_segments: u32) -> u32 {
    let min = min_segments.max(1);
    let max = max_segments.max(min);
    let raw = if length_m.is_finite() && segment_length > 0.0 && length_m > 0.0 {
        (length_m / segment_length).floor() as u32
    } else {
        0
    };
    raw.clamp(min, max)
}

/// Segment type for `index`.
///
/// Precedence, highest first:
/// 1. last segment is a Checkpoint (also when it is index 0 or 1)
/// 2. indices 0 and 1 are Straight (onboarding)
/// 3. every `checkpoint_interval`-th index is a Checkpoint, when enabled
/// 4. random: Straight above the variety threshold, otherwise a weighted special type
///
/// Two draws are consumed regardless of the outcome so later layout draws
/// keep their position in the stream.
pub fn resolve_segment_type(
    index: u32,
    count: u32,
    checkpoints_enabled: bool,
    checkpoint_interval: u32,
    variety_factor: f32,
    rng: &mut SegmentRng,
) -> SegmentType {
    let roll = rng.unit();
    let pick = rng.unit();

    if index + 1 == count {
        return SegmentType::Checkpoint;
    }
    if index < 2 {
        return SegmentType::Straight;
    }
    if checkpoints_enabled && checkpoint_interval > 0 && index % checkpoint_interval == 0 {
        return SegmentType::Checkpoint;
    }

    if roll > lerp(0.1, 0.5, variety_factor) {
        return SegmentType::Straight;
    }
    SPECIAL_TYPES
        .iter()
        .find(|(threshold, _)| pick < *threshold)
        .map(|(_, kind)| *kind)
        .unwrap_or(SegmentType::Hazard)
}

/// Extrude the end pose of a segment from its start pose
fn extrude(start: &Pose, kind: SegmentType, length: f32, turn_sign: f32) -> Pose {
    let mut position = start.position + start.forward() * length;
    let mut rotation = start.rotation;
    match kind {
        SegmentType::Curve => {
            position += start.right() * CURVE_OFFSET * turn_sign;
            rotation = (rotation * Quat::from_rotation_y(CURVE_YAW * turn_sign)).normalize();
        }
        SegmentType::Uphill => position.y += HILL_RISE,
        SegmentType::Downhill => position.y -= HILL_RISE,
        _ => {}
    }
    Pose::new(position, rotation)
}

/// Plan a level: segment count, types, themes, difficulty and layout
pub fn plan(request: &LevelRequest, settings: &GenerationSettings) -> PlannedLevel {
    let mut settings = settings.clone();
    let diagnostics = settings.sanitize();
    for diagnostic in &diagnostics {
        diagnostic.report();
    }

    let count = segment_count(
        request.length_m,
        settings.segment_length,
        settings.min_segments,
        settings.max_segments,
    );
    let level_seed = derive_level_seed(request.seed);
    let mut level_rng = SegmentRng::for_stream(level_seed, SeedStream::Layout);
    let secondary_theme = request.theme.secondary_from_roll(level_rng.unit());
    let density = settings.density.factor();

    let plan = LevelPlan {
        length: request.length_m.max(0.0),
        segment_length: settings.segment_length,
        segment_width: settings.segment_width,
        min_segments: settings.min_segments,
        max_segments: settings.max_segments,
        segment_count: count,
        root_seed: request.seed,
        seed: level_seed,
        seed_version: SEED_MIX_VERSION,
        primary_theme: request.theme,
        secondary_theme,
        theme_blend: settings.theme_blend,
        difficulty: DifficultyCurve {
            start: settings.start_difficulty,
            end: settings.end_difficulty,
            ramp: settings.difficulty_ramp,
        },
        obstacle_density: settings.obstacles.density_factor * density,
        enemy_density: settings.enemies.density_factor * density,
        collectible_density: settings.collectibles.density_factor * density,
        checkpoints_enabled: settings.checkpoints_enabled,
        checkpoint_interval: settings.checkpoint_interval,
        dynamic_difficulty: settings.dynamic_difficulty,
        is_tutorial: request.is_tutorial,
        tutorial_window: settings.tutorial_window,
        variety_factor: settings.variety_factor,
    };

    let mut segments: Vec<Segment> = Vec::with_capacity(count as usize);
    let mut cursor = Pose::default();
    let mut floor_difficulty = MIN_DIFFICULTY;

    for index in 0..count {
        let seed = derive_segment_seed(level_seed, index);
        let mut rng = SegmentRng::for_stream(seed, SeedStream::Layout);

        let kind = resolve_segment_type(
            index,
            count,
            plan.checkpoints_enabled,
            plan.checkpoint_interval,
            plan.variety_factor,
            &mut rng,
        );

        let blend_roll = rng.unit();
        let progress = if count > 1 {
            index as f32 / (count - 1) as f32
        } else {
            0.0
        };
        let theme = if index >= 2 && kind != SegmentType::Checkpoint && blend_roll < plan.theme_blend * progress {
            plan.secondary_theme
        } else {
            plan.primary_theme
        };

        let turn_sign = rng.sign();
        let end = extrude(&cursor, kind, plan.segment_length, turn_sign);

        // Stored difficulty never regresses, even across a theme switch
        let difficulty = plan
            .difficulty
            .at(index, count, theme, plan.is_tutorial)
            .max(floor_difficulty);
        floor_difficulty = difficulty;

        if let Some(prev) = segments.last_mut() {
            prev.next = Some(index);
        }

        segments.push(Segment {
            index,
            kind,
            start: cursor,
            end,
            width: plan.segment_width * kind.width_scale(),
            length: plan.segment_length,
            theme,
            difficulty,
            seed,
            active: index == 0,
            generated: false,
            next: None,
        });
        cursor = end;
    }

    log::info!(
        "Planned level seed={} theme={} segments={} (secondary={})",
        request.seed,
        request.theme.as_str(),
        count,
        secondary_theme.as_str()
    );

    PlannedLevel {
        plan,
        segments,
        settings,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Theme;
    use crate::level::difficulty::difficulty_at;
    use proptest::prelude::*;

    fn raw_difficulty(plan: &LevelPlan, segment: &Segment) -> u8 {
        difficulty_at(
            segment.index,
            plan.segment_count,
            plan.difficulty.start,
            plan.difficulty.end,
            plan.difficulty.ramp,
            segment.theme,
            plan.is_tutorial,
        )
    }

    fn request(theme: Theme, length_m: f32, seed: u64) -> LevelRequest {
        LevelRequest {
            theme,
            length_m,
            seed,
            is_tutorial: false,
        }
    }

    #[test]
    fn test_volcano_scenario() {
        let settings = GenerationSettings::default();
        let planned = plan(&request(Theme::Volcano, 600.0, 42), &settings);
        let expected = (600.0f32 / 30.0) as u32;
        assert_eq!(planned.plan.segment_count, expected.clamp(settings.min_segments, settings.max_segments));
        assert_eq!(planned.segments.len(), 20);
        assert_eq!(planned.segments[0].kind, SegmentType::Straight);
        assert_eq!(planned.segments[1].kind, SegmentType::Straight);
        assert_eq!(planned.segments[19].kind, SegmentType::Checkpoint);

        let again = plan(&request(Theme::Volcano, 600.0, 42), &settings);
        let kinds: Vec<_> = planned.segments.iter().map(|s| s.kind).collect();
        let kinds_again: Vec<_> = again.segments.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, kinds_again);
        assert_eq!(planned.segments, again.segments);
    }

    #[test]
    fn test_single_segment_is_checkpoint() {
        let settings = GenerationSettings {
            min_segments: 1,
            ..Default::default()
        };
        let planned = plan(&request(Theme::City, 10.0, 7), &settings);
        assert_eq!(planned.segments.len(), 1);
        assert_eq!(planned.segments[0].kind, SegmentType::Checkpoint);
        assert!(planned.segments[0].active);
        assert_eq!(planned.segments[0].next, None);
    }

    #[test]
    fn test_two_segments_end_in_checkpoint() {
        let settings = GenerationSettings {
            min_segments: 1,
            ..Default::default()
        };
        let planned = plan(&request(Theme::City, 60.0, 7), &settings);
        let kinds: Vec<_> = planned.segments.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SegmentType::Straight, SegmentType::Checkpoint]);
    }

    #[test]
    fn test_periodic_checkpoints() {
        let settings = GenerationSettings::default();
        let planned = plan(&request(Theme::Forest, 900.0, 3), &settings);
        for seg in &planned.segments {
            if seg.index >= 2 && seg.index % 5 == 0 {
                assert_eq!(seg.kind, SegmentType::Checkpoint, "index {}", seg.index);
            }
        }

        let disabled = GenerationSettings {
            checkpoints_enabled: false,
            variety_factor: 0.0,
            ..Default::default()
        };
        let planned = plan(&request(Theme::Forest, 900.0, 3), &disabled);
        let last = planned.segments.len() - 1;
        for seg in &planned.segments[..last] {
            assert_ne!(seg.kind, SegmentType::Checkpoint);
        }
        assert_eq!(planned.segments[last].kind, SegmentType::Checkpoint);
    }

    #[test]
    fn test_count_is_clamped() {
        assert_eq!(segment_count(600.0, 30.0, 5, 60), 20);
        assert_eq!(segment_count(10.0, 30.0, 5, 60), 5);
        assert_eq!(segment_count(1.0e6, 30.0, 5, 60), 60);
        assert_eq!(segment_count(-50.0, 30.0, 5, 60), 5);
        assert_eq!(segment_count(f32::NAN, 30.0, 5, 60), 5);
        // Inverted bounds degrade to min
        assert_eq!(segment_count(600.0, 30.0, 8, 3), 8);
    }

    #[test]
    fn test_segments_are_linked_and_contiguous() {
        let planned = plan(&request(Theme::Tundra, 450.0, 11), &GenerationSettings::default());
        for pair in planned.segments.windows(2) {
            assert_eq!(pair[0].next, Some(pair[1].index));
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        let active: Vec<_> = planned.segments.iter().filter(|s| s.active).map(|s| s.index).collect();
        assert_eq!(active, vec![0]);
        assert!(planned.segments.iter().all(|s| !s.generated));
    }

    #[test]
    fn test_hill_and_curve_poses() {
        let start = Pose::default();
        let up = extrude(&start, SegmentType::Uphill, 30.0, 1.0);
        assert!((up.position.y - HILL_RISE).abs() < 1e-5);
        assert!((up.position.z - 30.0).abs() < 1e-5);

        let curve = extrude(&start, SegmentType::Curve, 30.0, -1.0);
        assert!((curve.position.x + CURVE_OFFSET).abs() < 1e-5);
        assert!(curve.forward().x < 0.0);
    }

    #[test]
    fn test_tutorial_difficulty_is_capped() {
        let req = LevelRequest {
            theme: Theme::Volcano,
            length_m: 900.0,
            seed: 5,
            is_tutorial: true,
        };
        let planned = plan(&req, &GenerationSettings::default());
        assert!(planned.segments.iter().all(|s| s.difficulty <= TUTORIAL_MAX_DIFFICULTY));
    }

    proptest! {
        #[test]
        fn prop_difficulty_never_regresses(seed in any::<u64>(), length in 0.0f32..3000.0, theme_idx in 0usize..6) {
            let theme = Theme::ALL[theme_idx];
            let planned = plan(&request(theme, length, seed), &GenerationSettings::default());
            for pair in planned.segments.windows(2) {
                prop_assert!(pair[1].difficulty >= pair[0].difficulty);
            }
            for seg in &planned.segments {
                prop_assert!(seg.difficulty >= raw_difficulty(&planned.plan, seg));
            }
            if let Some(last) = planned.segments.last() {
                prop_assert_eq!(last.kind, SegmentType::Checkpoint);
            }
        }
    }
}
