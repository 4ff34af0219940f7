// session.rs — Compilation session: component registry and declarations
//
// One `Session` holds every piece of mutable state of a generation run:
// the component arena with its per-kind name maps, virtual declarations,
// branches, state assignments, presets, patterns and the cache-slot counter.
// A fresh session is created per run, so nothing leaks between platforms.
//
// Preconditions: `load` is called before any declaration.
// Postconditions: after the pipeline passes, every component is ready for
//                 code generation (cache slots, packet fields, read-function
//                 suffixes and lowered references assigned).
// Failure modes: user errors are collected in `diagnostics`; none aborts.
// Side effects: none outside the session.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::branch::{BranchCollection, BranchId, BranchMember, Condition, MemberEmitter};
use crate::cache::CacheAllocator;
use crate::codegen::CodegenOptions;
use crate::component::{Component, PacketField};
use crate::diag::{codes, Diagnostic};
use crate::id::{ComponentId, IdAllocator, StateId};
use crate::platform::{ComponentKind, PlatformSpec};
use crate::usecase::{overflow_error, ParamEntry, Pattern, StateUseCase};
use crate::value::{CodeContext, Value};
use crate::virtual_component::{VirtualArena, VirtualDecl};

pub struct Session {
    platform: String,
    options: CodegenOptions,
    components: Vec<Component>,
    sensors: BTreeMap<String, ComponentId>,
    actuators: BTreeMap<String, ComponentId>,
    outputs: BTreeMap<String, ComponentId>,
    virtuals: VirtualArena,
    branches: BranchCollection,
    states: Vec<StateUseCase>,
    /// State ids per variable name, in declaration order.
    state_names: BTreeMap<String, Vec<StateId>>,
    presets: BTreeMap<String, Vec<ParamEntry>>,
    patterns: BTreeMap<String, Pattern>,
    cache: CacheAllocator,
    ids: IdAllocator,
    diagnostics: Vec<Diagnostic>,
}

impl Session {
    pub fn new(options: CodegenOptions) -> Self {
        let cache = CacheAllocator::new(options.condition_eval_period_ms);
        Session {
            platform: String::new(),
            options,
            components: Vec::new(),
            sensors: BTreeMap::new(),
            actuators: BTreeMap::new(),
            outputs: BTreeMap::new(),
            virtuals: VirtualArena::new(),
            branches: BranchCollection::new(),
            states: Vec::new(),
            state_names: BTreeMap::new(),
            presets: BTreeMap::new(),
            patterns: BTreeMap::new(),
            cache,
            ids: IdAllocator::new(),
            diagnostics: Vec::new(),
        }
    }

    // ── Loading ─────────────────────────────────────────────────────────

    /// Reset the session and instantiate every component of `platform`.
    /// A name repeated within one kind keeps the first specification.
    pub fn load(&mut self, platform: &PlatformSpec) {
        *self = Session::new(self.options.clone());
        self.platform = platform.name.clone();

        for spec in platform.components() {
            let key = spec.name.to_lowercase();
            let map = match spec.kind {
                ComponentKind::Sensor => &self.sensors,
                ComponentKind::Actuator => &self.actuators,
                ComponentKind::Output => &self.outputs,
            };
            if map.contains_key(&key) {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::E0104,
                        format!(
                            "component '{}' duplicated for platform '{}', ignoring",
                            spec.name, platform.name
                        ),
                    )
                    .with_subject(spec.name.clone()),
                );
                continue;
            }
            let id = self.ids.alloc_component();
            self.components.push(Component::new(
                id,
                key.clone(),
                Rc::new(spec.clone()),
                self.options.default_min_update_period_ms,
            ));
            self.kind_map_mut(spec.kind).insert(key, id);
        }
        tracing::debug!(
            platform = %platform.name,
            components = self.components.len(),
            "platform loaded"
        );
    }

    fn kind_map_mut(&mut self, kind: ComponentKind) -> &mut BTreeMap<String, ComponentId> {
        match kind {
            ComponentKind::Sensor => &mut self.sensors,
            ComponentKind::Actuator => &mut self.actuators,
            ComponentKind::Output => &mut self.outputs,
        }
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.index()]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.index()]
    }

    /// Case-insensitive lookup across kinds: sensors, then actuators, then
    /// outputs.
    pub fn find_component_by_name(&self, name: &str) -> Option<ComponentId> {
        find_in(&self.sensors, &self.actuators, &self.outputs, name)
    }

    /// `use` accepts any kind, `read` only sensors, `output` only outputs.
    pub fn find_component_by_keyword(&self, keyword: &str, name: &str) -> Option<ComponentId> {
        let key = name.to_lowercase();
        match keyword.to_lowercase().as_str() {
            "use" => self.find_component_by_name(&key),
            "read" => self.sensors.get(&key).copied(),
            "output" => self.outputs.get(&key).copied(),
            _ => None,
        }
    }

    pub fn has_component(&self, keyword: &str, name: &str) -> bool {
        self.find_component_by_keyword(keyword, name).is_some()
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Component> + '_ {
        self.sensors.values().map(|id| self.component(*id))
    }

    pub fn actuators(&self) -> impl Iterator<Item = &Component> + '_ {
        self.actuators.values().map(|id| self.component(*id))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Component> + '_ {
        self.outputs.values().map(|id| self.component(*id))
    }

    /// Every component: sensors, actuators, then outputs, each by name.
    pub fn all_components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.sensors().chain(self.actuators()).chain(self.outputs())
    }

    pub fn branches(&self) -> &BranchCollection {
        &self.branches
    }

    pub fn virtuals(&self) -> &VirtualArena {
        &self.virtuals
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.patterns.values()
    }

    pub fn state(&self, id: StateId) -> &StateUseCase {
        &self.states[id.index()]
    }

    /// First declaration of every state variable, by name.
    pub fn state_declarations(&self) -> impl Iterator<Item = &StateUseCase> + '_ {
        self.state_names
            .values()
            .filter_map(|ids| ids.first())
            .map(|id| self.state(*id))
    }

    pub fn cache_slots_used(&self) -> u32 {
        self.cache.slots_used()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Register a named parameter preset.
    pub fn define_parameters(&mut self, name: &str, parameters: Vec<ParamEntry>) {
        if self.presets.contains_key(name) {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::E0106,
                    format!("parameter define '{}' duplicated, ignoring", name),
                )
                .with_subject(name),
            );
            return;
        }
        self.presets.insert(name.to_string(), parameters);
    }

    /// Register a named interval pattern. Intervals that are not durations
    /// are reported and left out.
    pub fn add_pattern(&mut self, name: &str, intervals: &[Value]) {
        if self.patterns.contains_key(name) {
            self.diagnostics.push(
                Diagnostic::error(codes::E0203, format!("pattern '{}' duplicated, ignoring", name))
                    .with_subject(name),
            );
            return;
        }
        let mut millis = Vec::with_capacity(intervals.len());
        for v in intervals {
            match v.to_milliseconds() {
                Some(ms) => millis.push(ms),
                None => self.diagnostics.push(
                    Diagnostic::error(
                        codes::E0204,
                        format!("interval '{}' of pattern '{}' is not a duration", v, name),
                    )
                    .with_subject(name),
                ),
            }
        }
        self.patterns.insert(
            name.to_string(),
            Pattern {
                name: name.to_string(),
                intervals: millis,
            },
        );
    }

    pub fn add_virtual_component(&mut self, decl: VirtualDecl) {
        let shadows = self.find_component_by_name(&decl.name).is_some();
        self.virtuals
            .declare(decl, shadows, &mut self.ids, &mut self.diagnostics);
    }

    /// Resolve every virtual declaration, then materialize the resolved ones
    /// as concrete components in declaration order.
    pub fn resolve_virtual_components(&mut self) {
        {
            let (sensors, actuators, outputs) = (&self.sensors, &self.actuators, &self.outputs);
            let concrete = |name: &str| find_in(sensors, actuators, outputs, name);
            self.virtuals.resolve_all(&concrete, &mut self.diagnostics);
        }

        let ids: Vec<_> = self.virtuals.ids().collect();
        for vid in ids {
            if !self.virtuals.take_for_materialization(vid) {
                continue;
            }
            let v = self.virtuals.get(vid);
            let (base_id, merged) = v
                .resolved()
                .expect("internal: materializing an unresolved virtual component");
            let name = v.decl.name.clone();
            let process = v.decl.process.clone();
            let merged = merged.clone();

            let base = &self.components[base_id.index()];
            let kind = base.kind();
            let mut parameters = base.parameters.clone();
            let spec = Rc::clone(&base.spec);

            let id = self.ids.alloc_component();
            let mut c = Component::new(
                id,
                name.clone(),
                spec,
                self.options.default_min_update_period_ms,
            );
            for (k, value) in merged {
                parameters.insert(k, Some(value));
            }
            c.parameters = parameters;
            c.process = process;
            self.components.push(c);
            self.kind_map_mut(kind).insert(name.to_lowercase(), id);
            tracing::debug!(component = %name, base = %self.components[base_id.index()].name, "virtual component materialized");
        }
    }

    /// Attach a use-case to the component `name`, restricted by `keyword`.
    pub fn use_component(
        &mut self,
        keyword: &str,
        name: &str,
        parameters: &[ParamEntry],
        conditions: &[Condition],
        branch: BranchId,
    ) {
        let Some(id) = self.find_component_by_keyword(keyword, name) else {
            self.diagnostics.push(
                Diagnostic::error(
                    codes::E0101,
                    format!(
                        "component '{}' not known or not supported for architecture '{}'",
                        name, self.platform
                    ),
                )
                .with_subject(name),
            );
            return;
        };
        let c = &mut self.components[id.index()];
        let index = c.add_use_case(
            parameters,
            conditions,
            branch,
            &self.presets,
            &self.patterns,
            &mut self.diagnostics,
        );
        self.branches.add(
            branch,
            BranchMember::UseCase {
                component: id,
                index,
            },
            conditions,
            &mut self.diagnostics,
        );
    }

    /// Assign `value` to the state variable `name` while `branch` is active.
    pub fn set_state(&mut self, name: &str, value: Value, conditions: &[Condition], branch: BranchId) {
        if value.is_overflowing_duration() {
            self.diagnostics.push(overflow_error("value", name));
        }
        let id = self.ids.alloc_state();
        self.states.push(StateUseCase {
            id,
            name: name.to_string(),
            value,
            conditions: conditions.to_vec(),
            branch,
            lowered: None,
            c_type: None,
        });
        self.state_names.entry(name.to_string()).or_default().push(id);
        self.branches
            .add(branch, BranchMember::State(id), conditions, &mut self.diagnostics);
    }

    // ── Pre-generation passes ───────────────────────────────────────────

    /// Give a cache slot to every sensor sampled faster than it allows.
    pub fn mark_cached_sensors(&mut self) {
        let ids: Vec<_> = self.sensors.values().copied().collect();
        for id in ids {
            self.cache.check_use_cases(&mut self.components[id.index()]);
        }
    }

    /// Render every component reference in use-case parameters and state
    /// values to C. Reading a sensor this way marks it used.
    pub fn lower_references(&mut self) {
        let mut pending = Vec::new();
        for c in &self.components {
            for (index, uc) in c.use_cases.iter().enumerate() {
                for (name, value) in &uc.parameters {
                    if matches!(value, Value::Ref { .. }) {
                        pending.push((c.id, index, name.clone(), value.clone()));
                    }
                }
            }
        }
        for (id, index, name, value) in pending {
            let code = value.code_for_generator(self);
            self.components[id.index()].use_cases[index]
                .lowered
                .insert(name, code);
        }

        for i in 0..self.states.len() {
            let Value::Ref { component, field } = &self.states[i].value else {
                continue;
            };
            let (component, field) = (component.clone(), field.clone());
            let c_type = self
                .find_component_by_name(&component)
                .map(|id| self.component(id))
                .filter(|c| field == "value" && c.kind() == ComponentKind::Sensor)
                .map(Component::data_type);
            let code = self.replace_code(&component, &field);
            self.states[i].lowered = Some(code);
            self.states[i].c_type = c_type;
        }
    }

    /// Packet fields of aggregate outputs: every sensor with a scheduled
    /// use-case, in name order.
    pub fn assign_packets(&mut self) {
        let fields: Vec<PacketField> = self
            .sensors()
            .filter(|s| s.use_cases.iter().any(|uc| uc.generates_alarm))
            .map(|s| PacketField {
                width: s.data_size(),
                name: s.name.clone(),
            })
            .collect();
        let outputs: Vec<_> = self.outputs.values().copied().collect();
        for id in outputs {
            let o = &mut self.components[id.index()];
            if o.is_used() {
                o.cache_packet_type(fields.clone(), &mut self.diagnostics);
            }
        }
    }

    /// Number the per-use-case read functions of sensors whose read
    /// function depends on use-case parameters.
    pub fn assign_read_functions(&mut self) {
        let ids: Vec<_> = self.sensors.values().copied().collect();
        for id in ids {
            let c = &mut self.components[id.index()];
            if !c.spec.read_function_depends_on_params {
                continue;
            }
            let Some(state) = c.sensor_mut() else {
                continue;
            };
            let mut next = state.read_function_num;
            for uc in &mut c.use_cases {
                uc.read_function_suffix = next.to_string();
                next += 1;
            }
            if let Some(state) = c.sensor_mut() {
                state.read_function_num = next;
            }
        }
    }

    pub(crate) fn push_diagnostics(&mut self, diags: Vec<Diagnostic>) {
        self.diagnostics.extend(diags);
    }
}

fn find_in(
    sensors: &BTreeMap<String, ComponentId>,
    actuators: &BTreeMap<String, ComponentId>,
    outputs: &BTreeMap<String, ComponentId>,
    name: &str,
) -> Option<ComponentId> {
    let key = name.to_lowercase();
    sensors
        .get(&key)
        .or_else(|| actuators.get(&key))
        .or_else(|| outputs.get(&key))
        .copied()
}

// ── Late-bound references ───────────────────────────────────────────────────

impl CodeContext for Session {
    /// Resolve `component.field` for generated code: `ispresent`,
    /// `iserror` and `value` are understood.
    fn replace_code(&mut self, component: &str, field: &str) -> String {
        let Some(id) = self.find_component_by_name(component) else {
            if field != "ispresent" {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::E0101,
                        format!("component '{}' not known", component),
                    )
                    .with_subject(component),
                );
            }
            return "false".to_string();
        };

        match field {
            "ispresent" => "true".to_string(),
            "iserror" => {
                let c = &mut self.components[id.index()];
                match c.parameter_value("errorFunction").filter(|v| v.is_truthy()) {
                    Some(f) => {
                        let code = f.as_name();
                        c.mark_used();
                        code
                    }
                    None => {
                        self.diagnostics.push(
                            Diagnostic::error(
                                codes::E0402,
                                format!("component '{}' has no error attribute", component),
                            )
                            .with_subject(component),
                        );
                        "false".to_string()
                    }
                }
            }
            "value" => {
                let c = &mut self.components[id.index()];
                if c.kind() != ComponentKind::Sensor {
                    self.diagnostics.push(
                        Diagnostic::error(
                            codes::E0401,
                            format!("'{}' of component '{}' is not readable", field, component),
                        )
                        .with_subject(component),
                    );
                    return "false".to_string();
                }
                self.cache.check_condition_read(c);
                c.mark_used();
                c.raw_read_function("")
            }
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::E0403,
                        format!("unknown parameter '{}' for component '{}'", field, component),
                    )
                    .with_subject(component),
                );
                "false".to_string()
            }
        }
    }
}

// ── Branch members ──────────────────────────────────────────────────────────

impl MemberEmitter for Session {
    fn emit_enter(&self, member: BranchMember, out: &mut String) {
        match member {
            BranchMember::UseCase { component, index } => {
                let c = self.component(component);
                c.use_cases[index].generate_branch_enter(c, out);
            }
            BranchMember::State(id) => self.state(id).generate_branch_enter(out),
        }
    }

    fn emit_exit(&self, member: BranchMember, out: &mut String) {
        if let BranchMember::UseCase { component, index } = member {
            let c = self.component(component);
            c.use_cases[index].generate_branch_exit(c, out);
        }
    }
}
