// packet.rs — Output aggregation and packet layout
//
// Aggregate outputs buffer one field per sensor into a packed record and
// flush it once every field has been filled. Direct outputs forward each
// value as it is read. The serial sink additionally gets width-specific
// print helpers.
//
// Preconditions: packet fields are assigned before any generation call.
// Postconditions: an aggregate output with fields emits a struct, a typedef,
//                 an instance, a fill counter and Init/Send/IsFull helpers.
// Failure modes: an aggregate output with no fields reports E0501 and
//                generates no packet code.
// Side effects: none.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::component::{camel_case, Component, KindState, PacketField};
use crate::diag::{codes, Diagnostic};

/// Name of the output that gets serial print helpers.
pub const SERIAL_OUTPUT: &str = "serial";

// ── Layout ──────────────────────────────────────────────────────────────────

/// One member of the packed struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketMember {
    pub name: String,
    pub width: u32,
}

/// Member list of a packet: fields in declared order, then an optional
/// padding byte and 16-bit CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLayout {
    pub members: Vec<PacketMember>,
}

impl PacketLayout {
    pub fn new(fields: &[PacketField], crc: bool) -> Self {
        let mut members: Vec<PacketMember> = fields
            .iter()
            .map(|f| PacketMember {
                name: camel_case(&f.name),
                width: f.width,
            })
            .collect();
        if crc {
            let size: u32 = fields.iter().map(|f| f.width).sum();
            // crc must stay 2-byte aligned
            if size % 2 == 1 {
                members.push(PacketMember {
                    name: "__reserved".into(),
                    width: 1,
                });
            }
            members.push(PacketMember {
                name: "crc".into(),
                width: 2,
            });
        }
        PacketLayout { members }
    }

    /// Total size in bytes.
    pub fn size(&self) -> u32 {
        self.members.iter().map(|m| m.width).sum()
    }
}

// ── Output behaviour ────────────────────────────────────────────────────────

impl Component {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.state, KindState::Output(_)) && self.parameter_is_set("aggregate")
    }

    fn packet_fields(&self) -> &[PacketField] {
        self.output().map(|o| o.fields.as_slice()).unwrap_or(&[])
    }

    pub fn has_packet(&self) -> bool {
        self.is_aggregate() && !self.packet_fields().is_empty()
    }

    /// Store the packet field list of an aggregate output. No-op for
    /// direct outputs and other kinds.
    pub fn cache_packet_type(&mut self, fields: Vec<PacketField>, diags: &mut Vec<Diagnostic>) {
        if !self.is_aggregate() {
            return;
        }
        if fields.is_empty() {
            diags.push(
                Diagnostic::error(
                    codes::E0501,
                    format!("{}Packet has no fields", self.name_cc()),
                )
                .with_subject(self.name.clone())
                .with_hint("read at least one sensor periodically"),
            );
        }
        if let Some(o) = self.output_mut() {
            o.fields = fields;
        }
    }

    pub fn packet_layout(&self) -> PacketLayout {
        PacketLayout::new(self.packet_fields(), self.parameter_is_set("crc"))
    }

    pub fn generate_packet_type(&self, out: &mut String) {
        if !self.has_packet() {
            return;
        }
        let cc = self.name_cc();
        let _ = writeln!(out, "struct {}Packet_s {{", cc);
        for m in &self.packet_layout().members {
            let _ = writeln!(out, "    uint{}_t {};", m.width * 8, m.name);
        }
        out.push_str("} PACKED;\n\n");
        let _ = writeln!(out, "typedef struct {0}Packet_s {0}Packet_t;\n", cc);
    }

    pub fn generate_packet_variables(&self, out: &mut String) {
        if !self.has_packet() {
            return;
        }
        let cc = self.name_cc();
        let _ = writeln!(out, "{0}Packet_t {0}Packet;", cc);
        let _ = writeln!(out, "uint_t {}PacketNumFieldsFull;", cc);
    }

    /// Helper functions of a used output. `sensors_used` are the sensors
    /// whose callbacks forward values to outputs.
    pub fn generate_output_code(&self, sensors_used: &[&Component], out: &mut String) {
        if !self.is_used() {
            return;
        }
        if self.name.eq_ignore_ascii_case(SERIAL_OUTPUT) {
            self.generate_serial_helpers(sensors_used, out);
        }
        if !self.has_packet() {
            return;
        }

        let cc = self.name_cc();
        let uc = self.name_uc();

        let _ = writeln!(out, "static inline void {}PacketInit(void)", cc);
        out.push_str("{\n");
        let _ = writeln!(out, "    {}PacketNumFieldsFull = 0;", cc);
        for f in self.packet_fields() {
            let _ = writeln!(
                out,
                "    {}Packet.{} = {}_NO_VALUE;",
                cc,
                camel_case(&f.name),
                f.name.to_uppercase()
            );
        }
        out.push_str("}\n\n");

        let _ = writeln!(out, "static inline void {}PacketSend(void)", cc);
        out.push_str("{\n");
        if self.parameter_is_set("crc") {
            let _ = writeln!(
                out,
                "    {0}Packet.crc = crc16((const uint8_t *) &{0}Packet, sizeof({0}Packet) - 2);",
                cc
            );
        }
        if let Some(f) = self.parameter_value("useFunction").filter(|v| v.is_truthy()) {
            let _ = writeln!(out, "    {};", f.as_name());
        }
        let _ = writeln!(out, "    {}PacketInit();", cc);
        out.push_str("}\n\n");

        let _ = writeln!(out, "static inline bool {}PacketIsFull(void)", cc);
        out.push_str("{\n");
        let _ = writeln!(
            out,
            "    return {}PacketNumFieldsFull >= {}_PACKET_NUM_FIELDS;",
            cc, uc
        );
        out.push_str("}\n\n");
    }

    fn generate_serial_helpers(&self, sensors_used: &[&Component], out: &mut String) {
        let widths: BTreeSet<u32> = self
            .packet_fields()
            .iter()
            .map(|f| f.width)
            .chain(sensors_used.iter().map(|s| s.data_size()))
            .collect();
        for width in widths {
            let bits = width * 8;
            let conversion = if bits > 16 { "%lu" } else { "%u" };
            let _ = writeln!(
                out,
                "static inline void serialPrintU{}(const char *name, uint{}_t value)",
                bits, bits
            );
            out.push_str("{\n");
            let _ = writeln!(out, "    PRINTF(\"%s={}\\n\", name, value);", conversion);
            out.push_str("}\n\n");
        }

        if self.has_packet() {
            let cc = self.name_cc();
            out.push_str("static inline void serialPacketPrint(void)\n");
            out.push_str("{\n");
            out.push_str("    PRINT(\"======================\\n\");\n");
            for f in self.packet_fields() {
                let _ = writeln!(
                    out,
                    "    serialPrintU{}(\"{}\", {}Packet.{});",
                    f.width * 8,
                    f.name,
                    cc,
                    camel_case(&f.name)
                );
            }
            out.push_str("}\n\n");
        }
    }

    /// Code run in a sensor callback after `<sensor>Value` has been read.
    pub fn generate_callback_code(&self, sensor: &Component, out: &mut String) {
        let cc = self.name_cc();
        let s = sensor.name_cc();
        if !self.is_aggregate() {
            let _ = writeln!(
                out,
                "    {}PrintU{}(\"{}\", {}Value);",
                cc,
                sensor.data_bits(),
                s,
                s
            );
            return;
        }
        if !self
            .packet_fields()
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(&sensor.name))
        {
            return;
        }
        let _ = writeln!(
            out,
            "    if ({}Packet.{} == {}_NO_VALUE) {{",
            cc,
            s,
            sensor.name_uc()
        );
        let _ = writeln!(out, "        {}PacketNumFieldsFull++;", cc);
        out.push_str("    }\n");
        let _ = writeln!(out, "    {0}Packet.{1} = {1}Value;", cc, s);
        let _ = writeln!(out, "    if ({}PacketIsFull()) {{", cc);
        let _ = writeln!(out, "        {}PacketSend();", cc);
        out.push_str("    }\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ComponentId;
    use crate::platform::{ComponentKind, ComponentSpec, ParamSpec, ParamTag};
    use crate::value::Value;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn field(width: u32, name: &str) -> PacketField {
        PacketField {
            width,
            name: name.into(),
        }
    }

    fn output(name: &str, aggregate: bool, crc: bool) -> Component {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "aggregate".to_string(),
            ParamSpec {
                default: Some(Value::Bool(aggregate)),
                tag: ParamTag::Output,
            },
        );
        parameters.insert(
            "crc".to_string(),
            ParamSpec {
                default: Some(Value::Bool(crc)),
                tag: ParamTag::Output,
            },
        );
        parameters.insert(
            "useFunction".to_string(),
            ParamSpec {
                default: Some(Value::code("radioSend(&radioPacket, sizeof(radioPacket))")),
                tag: ParamTag::Code,
            },
        );
        let spec = Rc::new(ComponentSpec {
            name: name.into(),
            kind: ComponentKind::Output,
            min_update_period: None,
            read_function_depends_on_params: false,
            parameters,
        });
        let mut c = Component::new(ComponentId(0), name, spec, 1000);
        c.mark_used();
        c
    }

    #[test]
    fn odd_width_with_crc_gets_padding() {
        let layout = PacketLayout::new(&[field(1, "a"), field(1, "b")], true);
        assert_eq!(layout.size(), 5);
        assert_eq!(layout.members[2].name, "__reserved");
        assert_eq!(layout.members[3].name, "crc");
    }

    #[test]
    fn even_width_with_crc_has_no_padding() {
        let layout = PacketLayout::new(&[field(2, "a"), field(2, "b")], true);
        assert_eq!(layout.size(), 6);
        assert!(layout.members.iter().all(|m| m.name != "__reserved"));
    }

    #[test]
    fn no_crc_no_trailer() {
        let layout = PacketLayout::new(&[field(1, "a")], false);
        assert_eq!(layout.size(), 1);
    }

    #[test]
    fn empty_aggregate_packet_is_an_error() {
        let mut radio = output("radio", true, false);
        let mut diags = Vec::new();
        radio.cache_packet_type(Vec::new(), &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(codes::E0501));
        let mut out = String::new();
        radio.generate_packet_type(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn direct_output_ignores_fields() {
        let mut serial = output("serial", false, false);
        let mut diags = Vec::new();
        serial.cache_packet_type(vec![field(2, "temp")], &mut diags);
        assert!(diags.is_empty());
        assert!(serial.output().unwrap().fields.is_empty());
    }

    #[test]
    fn packet_struct_and_helpers() {
        let mut radio = output("radio", true, true);
        let mut diags = Vec::new();
        radio.cache_packet_type(vec![field(2, "light"), field(1, "humidity")], &mut diags);

        let mut out = String::new();
        radio.generate_packet_type(&mut out);
        assert_eq!(
            out,
            "struct radioPacket_s {\n    uint16_t light;\n    uint8_t humidity;\n    \
             uint8_t __reserved;\n    uint16_t crc;\n} PACKED;\n\n\
             typedef struct radioPacket_s radioPacket_t;\n\n"
        );

        let mut code = String::new();
        radio.generate_output_code(&[], &mut code);
        assert!(code.contains("    radioPacket.light = LIGHT_NO_VALUE;\n"));
        assert!(code.contains(
            "    radioPacket.crc = crc16((const uint8_t *) &radioPacket, sizeof(radioPacket) - 2);\n"
        ));
        assert!(code.contains("    radioSend(&radioPacket, sizeof(radioPacket));\n"));
        assert!(code.contains("return radioPacketNumFieldsFull >= RADIO_PACKET_NUM_FIELDS;"));
    }

    #[test]
    fn serial_helpers_per_width() {
        let serial = output("serial", false, false);
        let mut out = String::new();
        serial.generate_serial_helpers(&[], &mut out);
        assert!(out.is_empty());

        let mut serial = output("serial", true, false);
        let mut diags = Vec::new();
        serial.cache_packet_type(vec![field(2, "light"), field(4, "counter")], &mut diags);
        serial.generate_serial_helpers(&[], &mut out);
        assert!(out.contains("static inline void serialPrintU16(const char *name, uint16_t value)"));
        assert!(out.contains("    PRINTF(\"%s=%lu\\n\", name, value);"));
        assert!(out.contains("    serialPrintU32(\"counter\", serialPacket.counter);"));
    }
}
