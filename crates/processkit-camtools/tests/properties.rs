use proptest::prelude::*;

use processkit_camtools::{
    validate_plan, validate_program, CodeEmitter, Planner, RuleBasedPlanner,
};
use processkit_core::{HoleSpec, KnowledgeBase, PartSpec, PlanStep};

fn arb_material() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("aluminum_6061"), Just("steel_1018")]
}

fn arb_hole() -> impl Strategy<Value = HoleSpec> {
    (
        prop_oneof![Just(3.0), Just(6.0), Just(10.0), 0.5f64..25.0],
        0.1f64..50.0,
        -500.0f64..500.0,
        -500.0f64..500.0,
    )
        .prop_map(|(diameter, depth, x, y)| HoleSpec::new(diameter, depth, x, y))
}

fn arb_spec() -> impl Strategy<Value = PartSpec> {
    (arb_material(), prop::collection::vec(arb_hole(), 0..12))
        .prop_map(|(material, holes)| PartSpec::new(material).with_holes(holes))
}

proptest! {
    #[test]
    fn generate_then_emit_is_deterministic(spec in arb_spec()) {
        let kb = KnowledgeBase::bundled().unwrap();
        let emitter = CodeEmitter::default();
        let first = RuleBasedPlanner.generate(&spec, &kb).unwrap();
        let second = RuleBasedPlanner.generate(&spec, &kb).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(emitter.emit(&first, &kb).text, emitter.emit(&second, &kb).text);
    }

    #[test]
    fn plan_preserves_hole_order(spec in arb_spec()) {
        let kb = KnowledgeBase::bundled().unwrap();
        let plan = RuleBasedPlanner.generate(&spec, &kb).unwrap();
        prop_assert_eq!(plan.len(), spec.holes.len() + 1);
        prop_assert!(matches!(plan.steps[0], PlanStep::FaceMilling(_)));
        let positions: Vec<[f64; 2]> = plan
            .drilling_steps()
            .map(|step| step.position.unwrap())
            .collect();
        let expected: Vec<[f64; 2]> = spec.holes.iter().map(|hole| hole.position).collect();
        prop_assert_eq!(positions, expected);
    }

    #[test]
    fn validated_plans_emit_valid_programs(spec in arb_spec()) {
        let kb = KnowledgeBase::bundled().unwrap();
        let plan = RuleBasedPlanner.generate(&spec, &kb).unwrap();
        prop_assert!(validate_plan(&plan).is_valid());
        let program = CodeEmitter::default().emit(&plan, &kb);
        prop_assert!(validate_program(&program.text).is_valid());
        prop_assert!(program.fallbacks.is_empty());
    }

    #[test]
    fn non_positive_depth_is_rejected(
        spec in arb_spec(),
        depth in -10.0f64..=0.0,
        index in 0usize..12,
    ) {
        let kb = KnowledgeBase::bundled().unwrap();
        let mut spec = spec;
        let position = index.min(spec.holes.len());
        spec.holes.insert(position, HoleSpec::new(6.0, depth, 0.0, 0.0));
        let plan = RuleBasedPlanner.generate(&spec, &kb).unwrap();
        let report = validate_plan(&plan);
        prop_assert!(!report.is_valid());
        prop_assert_eq!(report.errors.len(), 1);
        prop_assert_eq!(report.errors[0].kind(), "InvalidDepth");
        prop_assert_eq!(report.errors[0].step(), Some(position + 1));
    }
}
