// Integration tests for the full generation pipeline.
//
// Each test compiles a small application against the telosb fixture
// platform through `pipeline::compile` and checks the emitted C sections
// and the diagnostics.

use sealc::codegen::{CodegenOptions, GeneratedCode};
use sealc::diag::{codes, DiagCode, Diagnostic};
use sealc::pass::{required_passes, PassId};
use sealc::pipeline::{compile, run_pipeline, CompilationState, Program};
use sealc::platform::PlatformSpec;

const PLATFORM: &str = include_str!("fixtures/telosb.json");

fn build(program: &str) -> CompilationState {
    build_with(program, CodegenOptions::default())
}

fn build_with(program: &str, options: CodegenOptions) -> CompilationState {
    let program = Program::from_json(program).expect("test program must parse");
    compile(PLATFORM, program, options).expect("fixture platform must load")
}

fn generated(state: &CompilationState) -> &GeneratedCode {
    state.generated.as_ref().expect("codegen did not run")
}

fn codes_of(diags: &[Diagnostic]) -> Vec<DiagCode> {
    diags.iter().filter_map(|d| d.code).collect()
}

fn assert_clean(state: &CompilationState) {
    assert!(
        !state.has_error,
        "unexpected errors: {:?}",
        state.diagnostics
    );
}

// ── Read cache ──────────────────────────────────────────────────────────────

#[test]
fn temp_read_faster_than_minimum_goes_through_cache() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 500}]},
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 2000}],
             "conditions": [1], "branch": 1},
            {"kind": "use", "keyword": "output", "component": "serial"}
        ]}"#,
    );
    assert_clean(&state);
    assert_eq!(state.session.cache_slots_used(), 1);

    let g = generated(&state);
    assert_eq!(g.includes, "#include \"hw_temp.h\"\n");
    assert_eq!(
        g.constants,
        "#define TEMP_PERIOD    500\n\
         #define TEMP_BRANCH1_PERIOD    2000\n\
         #define TEMP_NO_VALUE    0xffff\n"
    );
    assert!(g
        .callbacks
        .contains("    value = cacheReadSensorU16(0, &tempReadRaw, 1000);\n"));
    assert!(g.callbacks.contains(
        "void tempBranch1Callback(void *__unused)\n{\n    \
         uint16_t tempValue = tempReadProcess();\n    \
         serialPrintU16(\"temp\", tempValue);\n    \
         alarmSchedule(&tempBranch1Alarm, TEMP_BRANCH1_PERIOD);\n}\n"
    ));
    assert!(g
        .variables
        .contains("Alarm_t tempAlarm;\nAlarm_t tempBranch1Alarm;\n"));
}

#[test]
fn slow_reads_use_the_hardware_directly() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "light",
             "parameters": [{"name": "period", "value": 500}]}
        ]}"#,
    );
    assert_clean(&state);
    assert_eq!(state.session.cache_slots_used(), 0);
    assert!(generated(&state)
        .callbacks
        .contains("    value = lightReadRaw();\n"));
}

#[test]
fn condition_reads_faster_than_minimum_are_cached() {
    let options = CodegenOptions {
        condition_eval_period_ms: 250,
        ..CodegenOptions::default()
    };
    let state = build_with(
        r#"{"declarations": [
            {"kind": "set_state", "name": "reading",
             "value": {"component": "temp", "field": "value"},
             "conditions": [2], "branch": 1}
        ]}"#,
        options,
    );
    assert_clean(&state);
    assert_eq!(state.session.cache_slots_used(), 1);

    let g = generated(&state);
    assert!(g.branches.contains(
        "void branch1Start(void)\n{\n    \
         reading = cacheReadSensorU16(0, &tempReadRaw, 1000);\n}\n"
    ));
    // read only through the reference, still gets its read functions
    assert!(g.callbacks.contains("static inline uint16_t tempReadRaw(void)\n"));
    assert!(!g.callbacks.contains("tempCallback"));
}

#[test]
fn referenced_state_is_declared_with_a_constant_initializer() {
    let state = build(
        r#"{"declarations": [
            {"kind": "set_state", "name": "reading",
             "value": {"component": "temp", "field": "value"},
             "conditions": [1], "branch": 1}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert!(g.variables.contains("uint16_t reading = 0;\n"));
    assert!(!g.variables.contains("ReadRaw"));
    assert!(g.branches.contains("    reading = tempReadRaw();\n"));
}

#[test]
fn oversized_durations_are_reported_not_computed() {
    let state = build(
        r#"{"declarations": [
            {"kind": "set_state", "name": "big",
             "value": {"amount": 18446744073709551615, "unit": "h"}},
            {"kind": "use", "component": "led",
             "parameters": [{"name": "period", "value": {"amount": 18446744073709551615, "unit": "min"}}]}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0204, codes::E0204]);
    assert!(state.generated.is_some());
}

// ── Branches ────────────────────────────────────────────────────────────────

#[test]
fn branches_start_and_stop_their_use_cases() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "use", "component": "led",
             "parameters": [{"name": "period", "value": {"amount": 1, "unit": "s"}}],
             "conditions": [3], "branch": 2},
            {"kind": "set_state", "name": "mode", "value": 7,
             "conditions": [3], "branch": 2}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert_eq!(
        g.branches,
        "void branch0Start(void)\n{\n    tempCallback(NULL);\n}\n\n\
         void branch0Stop(void)\n{\n    alarmRemove(&tempAlarm);\n}\n\n\
         void branch2Start(void)\n{\n    ledBranch2Callback(NULL);\n    mode = 7;\n}\n\n\
         void branch2Stop(void)\n{\n    alarmRemove(&ledBranch2Alarm);\n}\n\n"
    );
    assert!(g.variables.contains("int32_t mode = 7;\n"));
    assert!(g.constants.contains("#define LED_BRANCH2_PERIOD    1000\n"));
    assert!(g.callbacks.contains("    ledToggle(0);\n"));
}

#[test]
fn divergent_conditions_warn_but_compile() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "component": "led", "conditions": [1], "branch": 1,
             "parameters": [{"name": "once"}]},
            {"kind": "use", "component": "led", "conditions": [2], "branch": 1,
             "parameters": [{"name": "once"}]}
        ]}"#,
    );
    assert_clean(&state);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::W0001]);
    assert_eq!(state.session.branches().conditions(1), &[1]);

    let g = generated(&state);
    assert!(g.callbacks.contains("void ledBranch1Callback(void *__unused)\n"));
    assert!(g.callbacks.contains("void ledBranch1Callback1(void *__unused)\n"));
}

#[test]
fn patterns_drive_the_alarm_cursor() {
    let state = build(
        r#"{"declarations": [
            {"kind": "pattern", "name": "blink",
             "intervals": [100, {"amount": 1, "unit": "s"}]},
            {"kind": "use", "component": "led",
             "parameters": [{"name": "pattern", "value": "blink"},
                            {"name": "color", "value": 2}]}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert!(g.variables.contains(
        "static const uint32_t __pattern_blink[] = {100, 1000};\nuint_t __pattern_blinkCursor;\n"
    ));
    assert!(g.callbacks.contains(
        "    ledToggle(2);\n    \
         alarmSchedule(&ledAlarm, __pattern_blink[__pattern_blinkCursor]);\n    \
         __pattern_blinkCursor++;\n    \
         __pattern_blinkCursor %= sizeof(__pattern_blink) / sizeof(*__pattern_blink);\n"
    ));
    assert!(g
        .branches
        .contains("    alarmRemove(&ledAlarm);\n    __pattern_blinkCursor = 0;\n"));
}

// ── Virtual components ─────────────────────────────────────────────────────

#[test]
fn virtual_chain_inherits_parameters() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Hot", "bases": ["temp"],
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "virtual", "name": "Hotter", "bases": ["Hot"]},
            {"kind": "use", "keyword": "read", "component": "hotter"}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert!(g.constants.contains("#define HOTTER_PERIOD    2000\n"));
    assert!(g
        .callbacks
        .contains("static inline uint16_t hotterReadRaw(void)\n{\n    return hwTempRead();\n}\n"));
    assert!(g.callbacks.contains("void hotterCallback(void *__unused)\n"));
    // the base itself stays unused
    assert!(!g.callbacks.contains("tempReadRaw"));
}

#[test]
fn constant_base_provides_the_value() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Five", "bases": ["constant:5"]},
            {"kind": "use", "keyword": "read", "component": "Five",
             "parameters": [{"name": "period", "value": 1000}]}
        ]}"#,
    );
    assert_clean(&state);
    assert!(generated(&state)
        .callbacks
        .contains("static inline uint16_t fiveReadRaw(void)\n{\n    return 5;\n}\n"));
}

#[test]
fn virtual_processing_is_applied_to_reads() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Peak", "bases": ["temp"],
             "process": {"function": "max", "arguments": [{"function": "min"}]}},
            {"kind": "use", "keyword": "read", "component": "peak",
             "parameters": [{"name": "period", "value": 2000}]}
        ]}"#,
    );
    assert_clean(&state);
    assert!(generated(&state).callbacks.contains(
        "    static uint16_t minValue0 = 0xffff;\n    \
         if (minValue0 > value) minValue0 = value;\n    \
         else value = minValue0;\n    \
         static uint16_t maxValue1 = 0;\n    \
         if (maxValue1 < value) maxValue1 = value;\n    \
         else value = maxValue1;\n"
    ));
}

#[test]
fn virtual_cycle_is_reported_and_generation_continues() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "A", "bases": ["B"]},
            {"kind": "virtual", "name": "B", "bases": ["A"]},
            {"kind": "use", "keyword": "read", "component": "light",
             "parameters": [{"name": "period", "value": 500}]}
        ]}"#,
    );
    assert!(state.has_error);
    let found = codes_of(&state.diagnostics);
    assert!(found.contains(&codes::E0301), "got {:?}", found);
    assert!(!state.session.has_component("read", "a"));
    assert!(generated(&state).callbacks.contains("void lightCallback"));
}

// ── Actuators and references ───────────────────────────────────────────────

#[test]
fn print_actuator_formats_sensor_reads() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "component": "print",
             "parameters": [{"name": "format", "value": "t=%u\n"},
                            {"name": "arg0", "value": {"component": "temp", "field": "value"}},
                            {"name": "arg1", "value": {"component": "temp", "field": "iserror"}},
                            {"name": "period", "value": 1000}]}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert!(g.callbacks.contains(
        "void printCallback(void *__unused)\n{\n    \
         PRINTF(\"t=%u\\n\", tempReadRaw(), hwTempIsError());\n    \
         alarmSchedule(&printAlarm, PRINT_PERIOD);\n}\n"
    ));
    assert!(g.callbacks.contains("static inline uint16_t tempReadProcess(void)\n"));
    assert!(g.constants.contains("#define TEMP_NO_VALUE    0xffff\n"));
}

#[test]
fn bad_references_fall_back_to_false() {
    let state = build(
        r#"{"declarations": [
            {"kind": "set_state", "name": "a", "value": {"component": "led", "field": "value"}},
            {"kind": "set_state", "name": "b", "value": {"component": "temp", "field": "colour"}},
            {"kind": "set_state", "name": "c", "value": {"component": "ghost", "field": "ispresent"}},
            {"kind": "set_state", "name": "d", "value": {"component": "light", "field": "iserror"}}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(
        codes_of(&state.diagnostics),
        vec![codes::E0401, codes::E0403, codes::E0402]
    );
    let g = generated(&state);
    for name in ["a", "b", "c", "d"] {
        assert!(g.variables.contains(&format!("int32_t {} = 0;\n", name)));
        assert!(g.branches.contains(&format!("    {} = false;\n", name)));
    }
}

#[test]
fn print_accepts_the_last_positional_argument() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "component": "print",
             "parameters": [{"name": "format", "value": "%d %u"},
                            {"name": "arg0", "value": 1},
                            {"name": "arg99", "value": {"component": "temp", "field": "value"}},
                            {"name": "arg100", "value": 2},
                            {"name": "once"}]}
        ]}"#,
    );
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0102]);
    assert!(generated(&state)
        .callbacks
        .contains("    PRINTF(\"%d %u\", 1, tempReadRaw());\n"));
}

#[test]
fn actuator_without_use_function_is_reported() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Dark", "bases": ["led"],
             "parameters": [{"name": "useFunction", "value": ""}]},
            {"kind": "use", "component": "dark",
             "parameters": [{"name": "period", "value": 1000}]}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0107]);
    assert!(generated(&state).callbacks.contains(
        "void darkCallback(void *__unused)\n{\n    alarmSchedule(&darkAlarm, DARK_PERIOD);\n}\n"
    ));
}

#[test]
fn unknown_component_is_reported() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "led"},
            {"kind": "use", "component": "humidity"}
        ]}"#,
    );
    assert_eq!(
        codes_of(&state.diagnostics),
        vec![codes::E0101, codes::E0101]
    );
}

// ── Sensors ─────────────────────────────────────────────────────────────────

#[test]
fn dependent_read_functions_are_generated_per_use_case() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "adc",
             "parameters": [{"name": "channel", "value": 1}, {"name": "period", "value": 2000}]},
            {"kind": "use", "keyword": "read", "component": "adc",
             "parameters": [{"name": "channel", "value": 3}, {"name": "period", "value": 3000}]}
        ]}"#,
    );
    assert_clean(&state);

    let g = generated(&state);
    assert_eq!(
        g.constants,
        "#define ADC_PERIOD    2000\n#define ADC_PERIOD1    3000\n#define ADC_NO_VALUE    0xffff\n"
    );
    for (suffix, channel) in [("0", 1), ("1", 3)] {
        assert!(g.callbacks.contains(&format!(
            "static inline uint16_t adcReadRaw{s}(void)\n{{\n    return adcRead({c});\n}}\n\n\
             static inline uint16_t adcReadProcess{s}(void)\n{{\n    uint16_t value;\n    \
             value = adcReadRaw{s}();\n    return value;\n}}\n",
            s = suffix,
            c = channel
        )));
    }
    assert!(g.callbacks.contains(
        "void adcCallback(void *__unused)\n{\n    uint16_t adcValue = adcReadProcess0();\n    \
         alarmSchedule(&adcAlarm, ADC_PERIOD);\n}\n"
    ));
    assert!(g.callbacks.contains(
        "void adcCallback1(void *__unused)\n{\n    uint16_t adcValue = adcReadProcess1();\n    \
         alarmSchedule(&adcAlarm1, ADC_PERIOD1);\n}\n"
    ));
    // no shared read function without a reference to the sensor
    assert!(!g.callbacks.contains("adcReadRaw(void)"));
}

#[test]
fn unknown_transform_is_reported_once_per_sensor() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Smooth", "bases": ["adc"],
             "process": {"function": "median"}},
            {"kind": "use", "keyword": "read", "component": "smooth",
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "use", "keyword": "read", "component": "smooth",
             "parameters": [{"name": "channel", "value": 2}, {"name": "period", "value": 3000}]}
        ]}"#,
    );
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0406]);
    let g = generated(&state);
    assert!(g.callbacks.contains("smoothReadProcess0"));
    assert!(g.callbacks.contains("smoothReadProcess1"));
}

#[test]
fn sensor_without_read_function_reads_zero() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Mute", "bases": ["temp"],
             "parameters": [{"name": "readFunction", "value": ""}]},
            {"kind": "use", "keyword": "read", "component": "mute",
             "parameters": [{"name": "period", "value": 2000}]}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0404]);
    assert!(generated(&state)
        .callbacks
        .contains("static inline uint16_t muteReadRaw(void)\n{\n    return 0;\n}\n"));
}

// ── Declarations ────────────────────────────────────────────────────────────

#[test]
fn duplicate_parameter_define_keeps_the_first() {
    let state = build(
        r#"{"declarations": [
            {"kind": "parameter_define", "name": "slow",
             "parameters": [{"name": "period", "value": 10000}]},
            {"kind": "parameter_define", "name": "slow",
             "parameters": [{"name": "period", "value": 500}]},
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "parameters", "value": "slow"}]}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0106]);
    assert_eq!(state.session.cache_slots_used(), 0);
    assert!(generated(&state)
        .constants
        .contains("#define TEMP_PERIOD    10000\n"));
}

#[test]
fn duplicate_pattern_keeps_the_first() {
    let state = build(
        r#"{"declarations": [
            {"kind": "pattern", "name": "blink", "intervals": [100, 200]},
            {"kind": "pattern", "name": "blink", "intervals": [300]},
            {"kind": "use", "component": "led",
             "parameters": [{"name": "pattern", "value": "blink"}]}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0203]);
    assert!(generated(&state)
        .variables
        .contains("static const uint32_t __pattern_blink[] = {100, 200};\n"));
}

// ── Packets ─────────────────────────────────────────────────────────────────

#[test]
fn radio_packet_collects_scheduled_sensors() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "use", "keyword": "read", "component": "light",
             "parameters": [{"name": "period", "value": 500}]},
            {"kind": "use", "keyword": "output", "component": "radio"}
        ]}"#,
    );
    assert_clean(&state);

    let radio = state.session.find_component_by_name("radio").unwrap();
    assert_eq!(state.session.component(radio).packet_layout().size(), 6);

    let g = generated(&state);
    assert!(g.variables.contains(
        "struct radioPacket_s {\n    uint16_t light;\n    uint16_t temp;\n    uint16_t crc;\n} PACKED;\n\n\
         typedef struct radioPacket_s radioPacket_t;\n"
    ));
    assert!(g
        .variables
        .contains("radioPacket_t radioPacket;\nuint_t radioPacketNumFieldsFull;\n"));
    assert!(g.constants.contains("#define RADIO_PACKET_NUM_FIELDS    2\n"));
    assert!(g.callbacks.contains(
        "    if (radioPacket.light == LIGHT_NO_VALUE) {\n        \
         radioPacketNumFieldsFull++;\n    }\n    \
         radioPacket.light = lightValue;\n    \
         if (radioPacketIsFull()) {\n        radioPacketSend();\n    }\n"
    ));
    assert!(g.callbacks.contains(
        "    radioPacket.crc = crc16((const uint8_t *) &radioPacket, sizeof(radioPacket) - 2);\n    \
         radioSend(&radioPacket, sizeof(radioPacket));\n    radioPacketInit();\n"
    ));
    assert!(g.main_init.ends_with("    radioPacketInit();\n"));
    assert!(g.includes.contains("#include \"radio.h\"\n"));
}

#[test]
fn odd_packet_is_padded_before_crc() {
    let state = build(
        r#"{"declarations": [
            {"kind": "virtual", "name": "Tiny", "bases": ["temp"],
             "parameters": [{"name": "dataSize", "value": 1}]},
            {"kind": "use", "keyword": "read", "component": "tiny",
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "use", "keyword": "output", "component": "radio"}
        ]}"#,
    );
    assert_clean(&state);
    assert!(generated(&state).variables.contains(
        "struct radioPacket_s {\n    uint8_t tiny;\n    uint8_t __reserved;\n    uint16_t crc;\n} PACKED;\n"
    ));
}

#[test]
fn output_use_case_can_disable_crc() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 2000}]},
            {"kind": "use", "keyword": "output", "component": "radio",
             "parameters": [{"name": "crc", "value": false}]}
        ]}"#,
    );
    assert_clean(&state);
    let radio = state.session.find_component_by_name("radio").unwrap();
    assert_eq!(state.session.component(radio).packet_layout().size(), 2);
    assert!(!generated(&state).callbacks.contains("crc16"));
}

#[test]
fn empty_packet_is_an_error() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "output", "component": "radio"}
        ]}"#,
    );
    assert!(state.has_error);
    assert_eq!(codes_of(&state.diagnostics), vec![codes::E0501]);
    assert!(!generated(&state).variables.contains("radioPacket_s"));
}

// ── Pipeline behaviour ─────────────────────────────────────────────────────

#[test]
fn passes_complete_in_dependency_order() {
    let platform = PlatformSpec::from_json(PLATFORM).unwrap();
    let mut state = CompilationState::new(platform, Program::default(), CodegenOptions::default());
    let mut seen = Vec::new();
    run_pipeline(&mut state, PassId::Codegen, |pass, _| seen.push(pass));
    assert_eq!(seen, required_passes(PassId::Codegen));
    assert!(state.provenance.is_some());
}

#[test]
fn partial_run_skips_generation() {
    let platform = PlatformSpec::from_json(PLATFORM).unwrap();
    let program = Program::from_json(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "period", "value": 500}]}
        ]}"#,
    )
    .unwrap();
    let mut state = CompilationState::new(platform, program, CodegenOptions::default());
    run_pipeline(&mut state, PassId::AssignCache, |_, _| {});
    assert!(state.generated.is_none());
    assert!(state.provenance.is_none());
    assert_eq!(state.session.cache_slots_used(), 1);
}

#[test]
fn invalid_platform_is_rejected() {
    let err = compile(
        r#"{"name": "x", "components": [{"name": "9lives", "kind": "sensor"}]}"#,
        Program::default(),
        CodegenOptions::default(),
    );
    assert!(err.is_err());
}

#[test]
fn config_lists_used_components_only() {
    let state = build(
        r#"{"declarations": [
            {"kind": "use", "keyword": "read", "component": "temp",
             "parameters": [{"name": "once"}]}
        ]}"#,
    );
    assert_clean(&state);
    let g = generated(&state);
    assert_eq!(g.config, "USE_HUMIDITY=y\n");
    assert!(!g.constants.contains("TEMP_PERIOD"));
    assert!(g.callbacks.contains(
        "void tempCallback(void *__unused)\n{\n    uint16_t tempValue = tempReadProcess();\n}\n"
    ));
}
