use sensorasm_assembler::{AssemblerConfig, AssemblerError, ParseError};
use sensorasm_driver::{DriverError, RegistryConfig, SensorId, SessionRegistry};

const INIT: &[u8] = b"\
.function init
WI2C $0x3008, $0x82, $1
CALL @start
.endfunction
.function start
WI2C $0x3008, $0x02, $1
.endfunction
";

const UPDATED: &[u8] = b"\
.function init
POLL:
RI2C R1, $0x300A, $1
JEZ R1, @POLL
.endfunction
";

#[test]
fn test_load_and_reload() {
    let mut registry = SessionRegistry::new();
    registry.open(SensorId(0), "front").unwrap();

    let image = registry.load_script(SensorId(0), INIT).unwrap();
    assert_eq!(image.instructions.len(), 3);
    assert_eq!(image.function("start"), Some(1));

    registry.load_script(SensorId(0), UPDATED).unwrap();
    let session = registry.session(SensorId(0)).unwrap();
    assert_eq!(session.reloads, 2);
    assert_eq!(session.digest, Some(blake3::hash(UPDATED)));
    assert_eq!(session.image.as_ref().unwrap().functions.len(), 1);
}

#[test]
fn test_failed_load_keeps_previous_image() {
    let mut registry = SessionRegistry::new();
    registry.open(SensorId(1), "rear").unwrap();
    registry.load_script(SensorId(1), INIT).unwrap();

    let err = registry
        .load_script(SensorId(1), b".function init\nADD R1, R2\n.endfunction\n")
        .unwrap_err();
    match err {
        DriverError::Script { sensor, source } => {
            assert_eq!(sensor, SensorId(1));
            assert_eq!(source.line(), Some(2));
            assert!(matches!(
                source,
                AssemblerError::Parse {
                    error: ParseError::Arity { .. },
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let session = registry.session(SensorId(1)).unwrap();
    assert_eq!(session.reloads, 1);
    assert_eq!(session.digest, Some(blake3::hash(INIT)));
    assert_eq!(registry.image(SensorId(1)).unwrap().instructions.len(), 3);
}

#[test]
fn test_sessions_are_independent() {
    let mut registry = SessionRegistry::new();
    registry.open(SensorId(2), "left").unwrap();
    registry.open(SensorId(1), "right").unwrap();

    registry.load_script(SensorId(2), INIT).unwrap();
    assert!(registry.image(SensorId(1)).is_none());

    let ids: Vec<_> = registry.sessions().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![SensorId(1), SensorId(2)]);

    let closed = registry.close(SensorId(2)).unwrap();
    assert!(closed.image.is_some());
    assert!(registry.image(SensorId(2)).is_none());
    assert!(matches!(
        registry.close(SensorId(2)),
        Err(DriverError::NotOpen(SensorId(2)))
    ));
}

#[test]
fn test_registry_uses_assembler_limits() {
    let mut registry = SessionRegistry::with_config(RegistryConfig {
        assembler: AssemblerConfig {
            max_instructions: 2,
            ..Default::default()
        },
        ..Default::default()
    });
    registry.open(SensorId(0), "tiny").unwrap();

    let err = registry.load_script(SensorId(0), INIT).unwrap_err();
    assert!(err.to_string().contains("instruction table is full"));
    assert!(registry.image(SensorId(0)).is_none());
}
