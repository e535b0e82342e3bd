//! Integration tests for end-to-end range store behavior.
//!
//! These tests verify the full pipeline:
//! Declare → Pack → Operate → Unpack → Verify

use std::sync::Arc;

use flatfield::{
    BinaryOp, ContinuousSpace, DomainSetRef, Encoding, Error, ErrorEstimate, ErrorMode,
    FunctionType, IntegerSpace, IrregularSet1D, Lifecycle, LinearAxis, LinearSet, LinearSpace,
    Operand, PolarCoordinateSystem, Precision, RangeComponent, RangeCoordinates, RangeStore, RangeType,
    RealTupleType, RealType, Sample, SamplingMode, Scalar, UnaryOp, ValueSpace, ValueSpaceRef,
};
use flatfield_tests::{assert_close, resampled, FieldHarness};
use flatfield_units::Unit;

/// Route engine logs to the test writer; `RUST_LOG=flatfield=trace` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test that every encoding returns packed values unchanged or within one
/// quantization step, and that NaN survives as missing.
#[test]
fn test_pack_unpack_round_trip() {
    let values = vec![0.0, 1.5, 2.25, f64::NAN];

    for precision in [Precision::Double, Precision::Single] {
        let store = FieldHarness::linear(0.0, 3.0, 4)
            .component("v", None)
            .spaces(vec![ContinuousSpace::shared(precision)])
            .with_values(vec![values.clone()]);
        assert_close(&store.unpack_values().unwrap()[0], &values, 0.0);
    }

    // step 0.25 over [0, 3]: 13 points -> INT8
    let coarse = FieldHarness::linear(0.0, 3.0, 4)
        .component("v", None)
        .spaces(vec![Arc::new(LinearSpace::new(0.0, 3.0, 13).unwrap())])
        .with_values(vec![values.clone()]);
    assert_eq!(coarse.encodings(), &[Encoding::I8]);
    let unpacked = coarse.unpack_values().unwrap();
    assert_close(&unpacked[0], &values, 0.25);
    assert!(unpacked[0][3].is_nan());

    for (count, encoding) in [(1000, Encoding::I16), (100_000, Encoding::I32)] {
        let fine = FieldHarness::linear(0.0, 3.0, 4)
            .component("v", None)
            .spaces(vec![Arc::new(LinearSpace::new(0.0, 3.0, count).unwrap())])
            .with_values(vec![values.clone()]);
        assert_eq!(fine.encodings(), &[encoding]);
        assert_close(&fine.unpack_values().unwrap()[0], &values, 3.0 / (count - 1) as f64);
    }
}

/// Test the cardinality thresholds of encoding selection.
#[test]
fn test_encoding_thresholds() {
    let cases = [
        (255, Encoding::I8),
        (256, Encoding::I16),
        (65535, Encoding::I16),
        (65536, Encoding::I32),
    ];
    for (cardinality, expected) in cases {
        let space = IntegerSpace::new(cardinality).unwrap();
        assert_eq!(Encoding::choose(&space), expected, "cardinality {cardinality}");
    }
    assert_eq!(
        Encoding::choose(ContinuousSpace::shared(Precision::Single).as_ref()),
        Encoding::Single
    );
    assert!(!Encoding::choose(ContinuousSpace::shared(Precision::Double).as_ref()).is_quantized());
}

/// Test the INT8 scenario: exact round trip, then NaNs once missing.
#[test]
fn test_quantized_scenario() {
    let space: ValueSpaceRef = Arc::new(LinearSpace::new(1.0, 4.0, 4).unwrap());
    assert_eq!(space.cardinality(), Some(4));

    let store = FieldHarness::linear(0.0, 3.0, 4)
        .component("level", None)
        .spaces(vec![space])
        .with_values(vec![vec![1.0, 2.0, 3.0, 4.0]]);
    assert_eq!(store.encodings(), &[Encoding::I8]);
    assert_eq!(store.get_values().unwrap(), vec![vec![1.0, 2.0, 3.0, 4.0]]);
    assert_eq!(store.lifecycle(), Lifecycle::Full);

    store.set_missing();
    let values = store.get_values().unwrap();
    assert_eq!(values[0].len(), 4);
    assert!(values[0].iter().all(|v| v.is_nan()));
}

/// Test that a missing operand short-circuits every operator.
#[test]
fn test_missing_propagation() {
    init_tracing();
    let harness = FieldHarness::linear(0.0, 3.0, 4).component("v", None);
    let missing = harness.build();
    let present = harness.with_values(vec![vec![1.0, 2.0, 3.0, 4.0]]);
    let ty = harness.function_type();

    for op in BinaryOp::ALL {
        let out = missing
            .binary(op, Operand::Field(&present), &ty, SamplingMode::NearestNeighbor, ErrorMode::Independent)
            .unwrap();
        assert!(out.is_missing(), "{op:?}");

        let out = present
            .binary(op, Operand::Field(&missing), &ty, SamplingMode::WeightedAverage, ErrorMode::Dependent)
            .unwrap();
        assert!(out.is_missing(), "{op:?}");
    }
    for op in UnaryOp::ALL {
        assert!(missing.unary(op, &ty, ErrorMode::NoErrors).unwrap().is_missing());
    }
    let none = Sample::real(f64::NAN, None);
    let out = present
        .binary(BinaryOp::Add, Operand::Value(&none), &ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
        .unwrap();
    assert!(out.is_missing());
}

/// Test that resampling onto the store's own sampling is the identity.
#[test]
fn test_resampling_identity() {
    let harness = FieldHarness::irregular(vec![0.0, 0.5, 2.0, 7.0]).component("v", None);
    let store = harness.with_values(vec![vec![1.0, -2.0, 3.5, f64::NAN]]);
    let same: DomainSetRef = Arc::new(IrregularSet1D::new(vec![0.0, 0.5, 2.0, 7.0], None).unwrap());

    for mode in [SamplingMode::NearestNeighbor, SamplingMode::WeightedAverage] {
        let out = store.resample(same.clone(), mode, ErrorMode::Independent).unwrap();
        assert_close(
            &out.unpack_values().unwrap()[0],
            &store.unpack_values().unwrap()[0],
            0.0,
        );
    }
}

/// Test the nearest-neighbor scenario with ties toward the lower index.
#[test]
fn test_nearest_neighbor_resampling() {
    init_tracing();
    let store = FieldHarness::linear(0.0, 3.0, 4)
        .component("v", None)
        .with_values(vec![vec![10.0, 20.0, 30.0, 40.0]]);

    let target: DomainSetRef = Arc::new(IrregularSet1D::new(vec![0.4, 2.6], None).unwrap());
    let out = resampled(&store, target, SamplingMode::NearestNeighbor);
    assert_eq!(out.unpack_values().unwrap(), vec![vec![10.0, 40.0]]);

    let midpoints: DomainSetRef = Arc::new(IrregularSet1D::new(vec![0.5, 1.5, 2.5], None).unwrap());
    let out = resampled(&store, midpoints, SamplingMode::NearestNeighbor);
    assert_eq!(out.unpack_values().unwrap(), vec![vec![10.0, 20.0, 30.0]]);

    let outside: DomainSetRef = Arc::new(IrregularSet1D::new(vec![-0.6, 3.5, 3.6], None).unwrap());
    let out = resampled(&store, outside, SamplingMode::NearestNeighbor);
    assert_close(&out.unpack_values().unwrap()[0], &[f64::NAN, 40.0, f64::NAN], 0.0);
}

/// Test multilinear interpolation over a 2-D grid.
#[test]
fn test_weighted_average_on_grid() {
    let ty = FunctionType::new(
        RealTupleType::new(vec![RealType::new("x", None), RealType::new("y", None)]),
        RangeType::Real(RealType::new("z", None)),
    );
    let grid: DomainSetRef = Arc::new(
        LinearSet::new(
            vec![LinearAxis::new(0.0, 1.0, 2).unwrap(), LinearAxis::new(0.0, 1.0, 2).unwrap()],
            vec![None, None],
        )
        .unwrap(),
    );
    let store = RangeStore::builder(ty, grid)
        .range_spaces(vec![ContinuousSpace::shared(Precision::Double)])
        .build()
        .unwrap();
    // z = x + 10y
    store.set_samples(vec![vec![0.0, 1.0, 10.0, 11.0]], None).unwrap();

    let center: DomainSetRef = Arc::new(
        LinearSet::new(
            vec![LinearAxis::new(0.5, 0.5, 1).unwrap(), LinearAxis::new(0.25, 0.25, 1).unwrap()],
            vec![None, None],
        )
        .unwrap(),
    );
    let out = resampled(&store, center, SamplingMode::WeightedAverage);
    assert_close(&out.unpack_values().unwrap()[0], &[3.0], 1e-12);
}

/// Test that addition converts the right operand to the absolute form of
/// the left unit.
#[test]
fn test_additive_unit_reconciliation() {
    let celsius = FieldHarness::linear(0.0, 2.0, 3)
        .component("t", Some(Unit::celsius()))
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let kelvin = FieldHarness::linear(0.0, 2.0, 3)
        .component("dt", Some(Unit::kelvin()))
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let a = celsius.with_values(vec![vec![0.0, 20.0, -10.0]]);
    let b = kelvin.with_values(vec![vec![1.0, 2.0, 3.0]]);

    let sum = a
        .binary(
            BinaryOp::Add,
            Operand::Field(&b),
            &celsius.function_type(),
            SamplingMode::NearestNeighbor,
            ErrorMode::NoErrors,
        )
        .unwrap();
    assert_eq!(sum.range_units(), &[Some(Unit::kelvin())]);
    assert_close(&sum.unpack_values().unwrap()[0], &[274.15, 295.15, 266.15], 1e-9);

    let reversed = b
        .binary(
            BinaryOp::Add,
            Operand::Field(&a),
            &kelvin.function_type(),
            SamplingMode::NearestNeighbor,
            ErrorMode::NoErrors,
        )
        .unwrap();
    assert_close(&reversed.unpack_values().unwrap()[0], &[274.15, 295.15, 266.15], 1e-9);
}

/// Test INDEPENDENT and DEPENDENT error combination for the additive family.
#[test]
fn test_error_combination_modes() {
    let harness = FieldHarness::linear(0.0, 1.0, 2)
        .component("v", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let a = harness.with_errors(vec![vec![1.0, 2.0]], &[0.3]);
    let b = harness.with_errors(vec![vec![5.0, 5.0]], &[0.4]);
    let ty = harness.function_type();

    for op in [BinaryOp::Add, BinaryOp::Subtract, BinaryOp::InvSubtract, BinaryOp::Max, BinaryOp::Min] {
        let independent = a
            .binary(op, Operand::Field(&b), &ty, SamplingMode::NearestNeighbor, ErrorMode::Independent)
            .unwrap();
        let e = independent.range_errors()[0].unwrap().error();
        assert!((e - 0.5).abs() < 1e-12, "{op:?}: {e}");

        let dependent = a
            .binary(op, Operand::Field(&b), &ty, SamplingMode::NearestNeighbor, ErrorMode::Dependent)
            .unwrap();
        let e = dependent.range_errors()[0].unwrap().error();
        assert!((e - 0.7).abs() < 1e-12, "{op:?}: {e}");
    }
}

/// Test arithmetic between stores on different samplings of one domain.
#[test]
fn test_arithmetic_resamples_operand() {
    let coarse = FieldHarness::linear(0.0, 4.0, 3)
        .component("v", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let a = coarse.with_values(vec![vec![1.0, 1.0, 1.0]]);
    let b = FieldHarness::linear(0.0, 4.0, 5)
        .component("w", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double)])
        .with_values(vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]]);

    let product = a
        .binary(
            BinaryOp::Multiply,
            Operand::Field(&b),
            &coarse.function_type(),
            SamplingMode::WeightedAverage,
            ErrorMode::NoErrors,
        )
        .unwrap();
    assert_eq!(product.length(), 3);
    assert_close(&product.unpack_values().unwrap()[0], &[0.0, 2.0, 4.0], 1e-12);
}

/// Test operator codes and reversed operators.
#[test]
fn test_operator_codes() {
    assert_eq!(BinaryOp::try_from(1).unwrap(), BinaryOp::Add);
    assert!(matches!(BinaryOp::try_from(99), Err(Error::UnsupportedOperation(_))));
    assert!(matches!(UnaryOp::try_from(7), Err(Error::UnsupportedOperation(_))));

    let harness = FieldHarness::linear(0.0, 1.0, 2)
        .component("v", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let a = harness.with_values(vec![vec![8.0, 9.0]]);
    let b = harness.with_values(vec![vec![2.0, 3.0]]);
    let ty = harness.function_type();
    for op in BinaryOp::ALL {
        let forward = a
            .binary(op, Operand::Field(&b), &ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
            .unwrap();
        let swapped = b
            .binary(op.invert(), Operand::Field(&a), &ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
            .unwrap();
        assert_close(
            &forward.unpack_values().unwrap()[0],
            &swapped.unpack_values().unwrap()[0],
            1e-12,
        );
    }
}

/// Test a polar range tuple combined with a Cartesian value.
#[test]
fn test_polar_range_with_cartesian_operand() {
    let polar = RealTupleType::with_coordinate_system(
        vec![
            RealType::new("r", Some(Unit::meters())),
            RealType::new("az", Some(Unit::degrees())),
        ],
        Arc::new(PolarCoordinateSystem::new()),
    )
    .unwrap();
    let ty = FunctionType::new(
        RealTupleType::new(vec![RealType::new("i", None)]),
        RangeType::RealTuple(polar),
    );
    let domain: DomainSetRef = Arc::new(LinearSet::linear_1d(0.0, 0.0, 1, None).unwrap());
    let store = RangeStore::builder(ty.clone(), domain)
        .range_spaces(vec![ContinuousSpace::shared(Precision::Double); 2])
        .build()
        .unwrap();
    store.set_samples(vec![vec![2.0], vec![90.0]], None).unwrap();

    // (0, 3) in x, y is (3 m, 90 deg)
    let offset = Sample::real_tuple(vec![
        Scalar::new(0.0, Some(Unit::meters())),
        Scalar::new(3.0, Some(Unit::meters())),
    ]);
    let sum = store
        .binary(BinaryOp::Add, Operand::Value(&offset), &ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
        .unwrap();
    let values = sum.unpack_values().unwrap();
    assert!((values[0][0] - 5.0).abs() < 1e-9);
    assert!((values[1][0] - 180.0).abs() < 1e-9);
}

/// Test that a declared result type must match the operand type up to names.
#[test]
fn test_binary_result_type_contract() {
    let plane = FieldHarness::linear(0.0, 1.0, 2)
        .component("x", Some(Unit::meters()))
        .component("y", Some(Unit::meters()))
        .spaces(vec![ContinuousSpace::shared(Precision::Double); 2]);
    let a = plane.with_values(vec![vec![0.0, 1.0], vec![2.0, 3.0]]);

    let polar = RealTupleType::with_coordinate_system(
        vec![
            RealType::new("r", Some(Unit::meters())),
            RealType::new("az", Some(Unit::degrees())),
        ],
        Arc::new(PolarCoordinateSystem::new()),
    )
    .unwrap();
    let polar_ty = FunctionType::new(plane.function_type().domain().clone(), RangeType::RealTuple(polar));
    let err = a
        .binary(BinaryOp::Add, Operand::Field(&a), &polar_ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
    let err = a.unary(UnaryOp::Negate, &polar_ty, ErrorMode::NoErrors).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));

    let renamed = FunctionType::new(
        plane.function_type().domain().clone(),
        RangeType::RealTuple(RealTupleType::new(vec![
            RealType::new("east", Some(Unit::kilometers())),
            RealType::new("north", Some(Unit::kilometers())),
        ])),
    );
    let sum = a
        .binary(BinaryOp::Add, Operand::Field(&a), &renamed, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
        .unwrap();
    assert_eq!(sum.function_type(), &renamed);
    assert!(matches!(sum.range_coordinates(), RangeCoordinates::Shared(None)));
    assert_eq!(sum.unpack_values().unwrap(), vec![vec![0.0, 2.0], vec![4.0, 6.0]]);
}

/// Test that out-of-range partial writes fail and leave the store intact.
#[test]
fn test_partial_write_bounds() {
    let store = FieldHarness::linear(0.0, 3.0, 4)
        .component("v", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double)])
        .with_values(vec![vec![1.0, 2.0, 3.0, 4.0]]);

    let err = store.set_samples_from(usize::MAX, &[vec![9.0f64]]).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { length: 4, .. }));
    let err = store.set_samples_from(3, &[vec![9.0f64, 9.0]]).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 4, length: 4 }));
    let err = store.set_samples_at(&[0, 4], &[vec![9.0f64, 9.0]]).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 4, length: 4 }));

    assert_eq!(store.unpack_values().unwrap(), vec![vec![1.0, 2.0, 3.0, 4.0]]);
}

/// Test per-sample writes, structured reads and incremental errors.
#[test]
fn test_sample_access() {
    let ty = FunctionType::new(
        RealTupleType::new(vec![RealType::new("i", None)]),
        RangeType::Tuple(vec![
            RangeComponent::Real(RealType::new("t", Some(Unit::kelvin()))),
            RangeComponent::RealTuple(RealTupleType::new(vec![
                RealType::new("u", Some(Unit::meters())),
                RealType::new("v", Some(Unit::meters())),
            ])),
        ]),
    );
    let domain: DomainSetRef = Arc::new(LinearSet::linear_1d(0.0, 2.0, 3, None).unwrap());
    let store = RangeStore::builder(ty, domain)
        .range_spaces(vec![ContinuousSpace::shared(Precision::Double); 3])
        .build()
        .unwrap();
    assert_eq!(store.lifecycle(), Lifecycle::Uninitialized);

    let sample = Sample::Tuple(vec![
        Sample::Real(Scalar::new(0.0, Some(Unit::celsius())).with_error(Some(ErrorEstimate::new(
            0.5,
            0.0,
            1,
            Some(Unit::celsius()),
        )))),
        Sample::real_tuple(vec![
            Scalar::new(1.0, Some(Unit::kilometers())),
            Scalar::new(2.0, Some(Unit::meters())),
        ]),
    ]);
    store.set_sample(1, &sample).unwrap();
    assert_eq!(store.lifecycle(), Lifecycle::Partial);

    let values = store.unpack_values().unwrap();
    assert!((values[0][1] - 273.15).abs() < 1e-9);
    assert_eq!(values[1][1], 1000.0);
    assert_eq!(values[2][1], 2.0);
    assert!(values[0][0].is_nan());

    let error = store.range_errors()[0].unwrap();
    assert!((error.error() - 0.5).abs() < 1e-9);
    assert_eq!(error.count(), 1);

    match store.get_sample(1).unwrap() {
        Sample::Tuple(items) => {
            assert_eq!(items.len(), 2);
            assert!(matches!(&items[1], Sample::RealTuple { components, .. } if components.len() == 2));
        }
        other => panic!("unexpected sample {other:?}"),
    }
    assert!(matches!(store.set_sample(3, &sample), Err(Error::IndexOutOfRange { .. })));
}

/// Test derivative and extraction on a harness-built store.
#[test]
fn test_derivative_and_extraction() {
    let harness = FieldHarness::linear(0.0, 4.0, 5)
        .component("a", None)
        .component("b", None)
        .spaces(vec![ContinuousSpace::shared(Precision::Double); 2]);
    let store = harness.with_values(vec![
        vec![0.0, 1.0, 4.0, 9.0, 16.0],
        vec![1.0, 1.0, 1.0, 1.0, 1.0],
    ]);

    let d = store.derivative(0, ErrorMode::NoErrors).unwrap();
    let values = d.unpack_values().unwrap();
    assert_close(&values[0], &[1.0, 2.0, 4.0, 6.0, 7.0], 1e-12);
    assert_close(&values[1], &[0.0; 5], 1e-12);

    let b = store.extract_component(1).unwrap();
    assert_eq!(b.range_dimension(), 1);
    assert_eq!(b.unpack_values().unwrap(), vec![vec![1.0; 5]]);
}

/// Test that unary results stay consistent with their inputs' units.
#[test]
fn test_unary_pipeline() {
    let harness = FieldHarness::linear(0.0, 2.0, 3)
        .component("angle", Some(Unit::degrees()))
        .spaces(vec![ContinuousSpace::shared(Precision::Double)]);
    let store = harness.with_values(vec![vec![0.0, 90.0, 180.0]]);
    let ty = harness.function_type();

    let cos = store.unary(UnaryOp::Cos, &ty, ErrorMode::NoErrors).unwrap();
    assert_close(&cos.unpack_values().unwrap()[0], &[1.0, 0.0, -1.0], 1e-12);

    let cos_deg = store.unary(UnaryOp::CosDegrees, &ty, ErrorMode::NoErrors).unwrap();
    assert_close(&cos_deg.unpack_values().unwrap()[0], &[1.0, 0.0, -1.0], 1e-12);

    let negated = store.unary(UnaryOp::Negate, &ty, ErrorMode::NoErrors).unwrap();
    assert_eq!(negated.range_units(), &[Some(Unit::degrees())]);
    assert_close(&negated.unpack_values().unwrap()[0], &[0.0, -90.0, -180.0], 0.0);
}
