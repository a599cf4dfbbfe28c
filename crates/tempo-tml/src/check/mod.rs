//! The type checker.
//!
//! `check_system` drives one pass over a built system in declaration order:
//! global declarations, templates (their declarations, states, edges and
//! sequence-chart records), instantiations and processes, I/O declarations,
//! progress measures, gantt charts, channel priorities, and finally the
//! queries. Every hook reports into a diagnostic buffer that is merged into
//! the system at the end together with the recorded facts (stopwatches,
//! strict invariants, synchronisation usage).
//!
//! The checker is one-shot and strictly sequential; it never fails hard.
//! Declarations are checked independently, and a subexpression that failed
//! short-circuits its parents instead of producing cascaded errors.

pub mod compat;
pub mod computable;
pub mod expr_typing;
pub mod predicates;
pub mod properties;
pub mod rates;
pub mod statements;
pub mod type_wf;

#[cfg(test)]
mod tests;

use crate::ast::{
    Block, ChanPriority, Decl, Declarations, Edge, EffectRegistry, Expr, ExprKind, FnEffects,
    Function, GanttChart, Instance, IoDecl, ProgressMeasure, State, SyncFlavor, SyncUsage, System,
    SystemFacts, Template, Variable,
};
use crate::check::compat::is_unique_reference;
use crate::check::computable::ComputableValues;
use crate::check::predicates::{
    has_strict_lower_bound, has_strict_upper_bound, is_guard, is_integer, is_integral,
    is_invariant_wr, is_probability, valid_return_type,
};
use crate::check::rates::RateDecomposer;
use crate::error::Diagnostic;
use crate::foundation::{Span, Type, TypeKind};
use indexmap::{IndexMap, IndexSet};

const CATEGORY: &str = "(typechecking)";

/// Snapshot of a dynamic template taken before the main pass, so spawn
/// sites can be checked without reaching back into the template list.
#[derive(Debug, Clone)]
pub(crate) struct DynTemplateSig {
    pub parameters: Vec<Type>,
    pub defined: bool,
}

/// One-shot type checker for a built system.
pub struct TypeChecker {
    diags: Vec<Diagnostic>,
    computable: ComputableValues,
    registry: EffectRegistry,
    dyn_templates: IndexMap<String, DynTemplateSig>,
    sync_used: SyncUsage,
    sync_error: bool,
    refinement_warnings: bool,
    return_type: Option<Type>,
    in_dynamic_template: bool,
    facts: SystemFacts,
}

/// Type check `system`, annotating expressions and recording diagnostics
/// and facts on it. Returns true iff the system has no errors afterwards.
pub fn check_system(system: &mut System) -> bool {
    check_system_with(system, false)
}

/// Like [`check_system`], with refinement-mode controllability warnings
/// enabled.
pub fn check_system_with(system: &mut System, refinement: bool) -> bool {
    let mut checker = TypeChecker::new(system, refinement);
    tracing::debug!(
        templates = system.templates.len(),
        dynamic = system.dynamic_templates.len(),
        "type checking system"
    );

    if let Some(expr) = &mut system.before_update {
        checker.check_expression(expr);
    }
    if let Some(expr) = &mut system.after_update {
        checker.check_expression(expr);
    }

    checker.visit_declarations(&mut system.global);

    for template in &mut system.templates {
        checker.visit_template(template);
    }
    for template in &mut system.dynamic_templates {
        checker.visit_template(template);
    }

    for instance in &mut system.instances {
        checker.visit_instance(instance);
    }
    for process in &mut system.processes {
        checker.visit_process(process);
    }

    for iodecl in &mut system.io_decls {
        checker.visit_io_decl(iodecl);
    }
    for progress in &mut system.progress {
        checker.visit_progress_measure(progress);
    }
    for gantt in &mut system.gantt_charts {
        checker.visit_gantt_chart(gantt);
    }
    checker.visit_system_after(&mut system.chan_priorities);

    for clock in &mut system.hybrid_clocks {
        checker.visit_hybrid_clock(clock);
    }
    for query in &mut system.queries {
        checker.visit_property(query);
    }

    checker.finish(system)
}

impl TypeChecker {
    /// Build a checker for `system`: collects the compile-time computable
    /// symbols and snapshots the dynamic template signatures.
    pub fn new(system: &System, refinement: bool) -> TypeChecker {
        let computable = ComputableValues::collect(system);
        let mut dyn_templates = IndexMap::new();
        for template in &system.dynamic_templates {
            dyn_templates.insert(
                template.inst.uid.name().to_string(),
                DynTemplateSig {
                    parameters: template
                        .inst
                        .parameters
                        .iter()
                        .map(|p| p.ty().clone())
                        .collect(),
                    defined: template.defined,
                },
            );
        }
        TypeChecker {
            diags: Vec::new(),
            computable,
            registry: EffectRegistry::new(),
            dyn_templates,
            sync_used: SyncUsage::Unused,
            sync_error: false,
            refinement_warnings: refinement,
            return_type: None,
            in_dynamic_template: false,
            facts: SystemFacts::default(),
        }
    }

    /// Merge accumulated diagnostics and facts into the system.
    pub fn finish(mut self, system: &mut System) -> bool {
        self.facts.sync_used = self.sync_used;
        let facts = &mut system.facts;
        facts.stopwatches |= self.facts.stopwatches;
        facts.strict_invariants |= self.facts.strict_invariants;
        facts.strict_lower_bound_on_controllable_edges |=
            self.facts.strict_lower_bound_on_controllable_edges;
        facts.urgent_transitions |= self.facts.urgent_transitions;
        facts.clock_guard_recv_broadcast |= self.facts.clock_guard_recv_broadcast;
        facts.sync_used = self.facts.sync_used;
        system.diagnostics.append(&mut self.diags);
        !system.has_errors()
    }

    pub(crate) fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diags.push(Diagnostic::error(span, message, CATEGORY));
    }

    pub(crate) fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.diags.push(Diagnostic::warning(span, message, CATEGORY));
    }

    pub(crate) fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub(crate) fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }

    pub(crate) fn dynamic_template(&self, name: &str) -> Option<&DynTemplateSig> {
        self.dyn_templates.get(name)
    }

    pub(crate) fn in_dynamic_template(&self) -> bool {
        self.in_dynamic_template
    }

    pub(crate) fn is_compile_time_computable(&self, expr: &Expr) -> bool {
        computable::is_compile_time_computable(expr, &self.computable, &self.registry)
    }

    #[cfg(test)]
    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }

    pub(crate) fn check_parameter_compatible(&mut self, param: &Type, arg: &Expr) -> bool {
        if !compat::is_parameter_compatible(param, arg) {
            self.error(arg.span, "$Incompatible_argument");
            return false;
        }
        true
    }

    // -- declaration hooks --------------------------------------------------

    fn visit_declarations(&mut self, declarations: &mut Declarations) {
        for decl in &mut declarations.decls {
            match decl {
                Decl::Variable(var) => self.visit_variable(var),
                Decl::Function(fun) => self.visit_function(fun),
            }
        }
    }

    fn visit_template(&mut self, template: &mut Template) {
        self.visit_template_before(template);
        self.visit_declarations(&mut template.declarations);
        for state in &mut template.states {
            self.visit_state(state);
        }
        for edge in &mut template.edges {
            self.visit_edge(edge);
        }
        for line in &mut template.instance_lines {
            self.visit_instance_line(line);
        }
        for message in &mut template.messages {
            self.visit_message(message);
        }
        for update in &mut template.updates {
            self.visit_update(update);
        }
        for condition in &mut template.conditions {
            self.visit_condition(condition);
        }
        self.visit_template_after();
    }

    pub fn visit_template_before(&mut self, template: &Template) {
        tracing::debug!(template = template.inst.uid.name(), "checking template");
        self.in_dynamic_template = template.dynamic;
    }

    pub fn visit_template_after(&mut self) {
        self.in_dynamic_template = false;
    }

    pub fn visit_variable(&mut self, variable: &mut Variable) {
        let ty = variable.uid.ty().clone();
        self.check_type(&ty, false, false);
        let Some(mut init) = variable.init.take() else {
            return;
        };
        if init.is_dynamic() || init.has_dynamic_sub() {
            self.error(init.span, "Dynamic constructions cannot be used as initialisers");
        } else if self.check_expression(&mut init) {
            if !self.is_compile_time_computable(&init) {
                self.error(init.span, "$Must_be_computable_at_compile_time");
            } else if init.changes_any_variable(&self.registry) {
                self.error(init.span, "$Initialiser_must_be_side-effect_free");
            } else {
                variable.init = Some(self.check_initialiser(&ty, init));
                return;
            }
        }
        variable.init = Some(init);
    }

    pub fn visit_state(&mut self, state: &mut State) {
        if let Some(mut invariant) = state.invariant.take() {
            let span = invariant.span;
            if self.check_expression(&mut invariant) {
                if !is_invariant_wr(&invariant) {
                    self.error(
                        span,
                        format!(
                            "$Expression_of_type {} $cannot_be_used_as_an_invariant",
                            invariant.ty
                        ),
                    );
                    state.invariant = Some(invariant);
                } else if invariant.changes_any_variable(&self.registry) {
                    self.error(span, "$Invariant_must_be_side-effect_free");
                    state.invariant = Some(invariant);
                } else {
                    let mut decomposer = RateDecomposer::new();
                    decomposer.decompose(&invariant, false);
                    state.invariant = decomposer.invariant;
                    state.cost_rate = decomposer.cost_rate;
                    if decomposer.count_cost_rates > 1 {
                        self.error(span, "$Only_one_cost_rate_is_allowed");
                    }
                    if decomposer.has_clock_rates {
                        self.facts.stopwatches = true;
                    }
                    if decomposer.has_strict_invariant {
                        self.facts.strict_invariants = true;
                        self.warning(span, "$Strict_invariant");
                    }
                }
            } else {
                state.invariant = Some(invariant);
            }
        }
        if let Some(rate) = &mut state.exp_rate {
            if self.check_expression(rate)
                && !is_integral(rate)
                && rate.kind != ExprKind::Fraction
                && !rate.ty.is_double()
            {
                self.error(rate.span, "$Number_expected");
            }
        }
    }

    pub fn visit_edge(&mut self, edge: &mut Edge) {
        for symbol in edge.select.iter() {
            self.check_type(symbol.ty(), false, false);
        }

        let mut strict_bound = false;
        if let Some(guard) = &mut edge.guard {
            if self.check_expression(guard) {
                if !is_guard(guard) {
                    self.error(
                        guard.span,
                        format!("$Expression_of_type {} $cannot_be_used_as_a_guard", guard.ty),
                    );
                } else if guard.changes_any_variable(&self.registry) {
                    self.error(guard.span, "$Guard_must_be_side-effect_free");
                }
                if has_strict_lower_bound(guard) {
                    if edge.control {
                        self.facts.strict_lower_bound_on_controllable_edges = true;
                    }
                    strict_bound = true;
                }
                if has_strict_upper_bound(guard) {
                    strict_bound = true;
                }
            }
        }

        if let Some(sync) = &mut edge.sync {
            if self.check_expression(sync) {
                let channel = sync.get(0).ty.clone();
                if !channel.is_channel() {
                    self.error(sync.get(0).span, "$Channel_expected");
                } else if sync.changes_any_variable(&self.registry) {
                    self.error(sync.span, "$Synchronisation_must_be_side-effect_free");
                } else {
                    let has_clock_guard =
                        edge.guard.as_ref().is_some_and(|guard| !is_integral(guard));
                    let is_urgent = channel.is(TypeKind::Urgent);
                    let receives_broadcast =
                        channel.is(TypeKind::Broadcast) && sync.sync == Some(SyncFlavor::Que);

                    if is_urgent && has_clock_guard {
                        self.facts.urgent_transitions = true;
                        self.warning(sync.span, "$Clock_guards_are_not_allowed_on_urgent_edges");
                    } else if receives_broadcast && has_clock_guard {
                        // Accepted, but the engine pays for it.
                        self.facts.clock_guard_recv_broadcast = true;
                    }
                    if receives_broadcast
                        && edge.guard.as_ref().map_or(true, |guard| guard.is_true())
                        && edge.dst.is_none()
                    {
                        self.warning(sync.span, "SMC requires input edges to be deterministic");
                    }
                    if is_urgent && strict_bound {
                        let span = edge.guard.as_ref().map(|g| g.span).unwrap_or(sync.span);
                        self.warning(span, "$Strict_bounds_on_urgent_edges_may_not_make_sense");
                    }
                }

                match self.sync_used {
                    SyncUsage::Unused => match sync.sync {
                        Some(SyncFlavor::Bang | SyncFlavor::Que) => {
                            self.sync_used = SyncUsage::Io;
                        }
                        Some(SyncFlavor::Csp) => self.sync_used = SyncUsage::Csp,
                        None => {}
                    },
                    SyncUsage::Io => {
                        if sync.sync == Some(SyncFlavor::Csp) {
                            self.sync_error = true;
                            self.error(sync.span, "$Assumed_IO_but_found_CSP_synchronization");
                        }
                    }
                    SyncUsage::Csp => {
                        if matches!(sync.sync, Some(SyncFlavor::Bang | SyncFlavor::Que)) {
                            self.sync_error = true;
                            self.error(sync.span, "$Assumed_CSP_but_found_IO_synchronization");
                        }
                    }
                }

                if self.refinement_warnings {
                    match sync.sync {
                        Some(SyncFlavor::Bang) => {
                            if edge.control {
                                self.warning(
                                    sync.span,
                                    "$Outputs_should_be_uncontrollable_for_refinement_checking",
                                );
                            }
                        }
                        Some(SyncFlavor::Que) => {
                            if !edge.control {
                                self.warning(
                                    sync.span,
                                    "$Inputs_should_be_controllable_for_refinement_checking",
                                );
                            }
                        }
                        _ => {
                            self.warning(
                                sync.span,
                                "$CSP_synchronisations_are_incompatible_with_refinement_checking",
                            );
                        }
                    }
                }
            }
        }

        self.check_assignment_expression(&mut edge.assign);

        if let Some(prob) = &mut edge.prob {
            if self.check_expression(prob) {
                if !is_probability(prob) {
                    self.error(
                        prob.span,
                        format!(
                            "$Expression_of_type {} $cannot_be_used_as_a_probability",
                            prob.ty
                        ),
                    );
                } else if prob.changes_any_variable(&self.registry) {
                    self.error(prob.span, "$Probability_must_be_side-effect_free");
                }
            }
        }
    }

    pub fn visit_function(&mut self, fun: &mut Function) {
        tracing::debug!(function = fun.uid.name(), "checking function");
        let return_type = fun.uid.ty().strip().get(0).clone();
        self.check_type(&return_type, false, false);
        if !return_type.is_void() && !valid_return_type(&return_type) {
            self.error(return_type.span(), "$Invalid_return_type");
        }

        // Return statements need the declared return type at hand.
        self.return_type = Some(return_type);
        self.check_block(&mut fun.body);
        self.return_type = None;

        self.check_dynamic_expressions(&fun.body);

        let mut changes = IndexSet::new();
        let mut depends = IndexSet::new();
        fun.body.for_each_expr(&mut |expr| {
            expr.collect_possible_writes(&self.registry, &mut changes);
            expr.collect_possible_reads(&self.registry, false, &mut depends);
        });
        // Neither parameters nor locals count as accessed by the function.
        let mut locals = IndexSet::new();
        fun.body.declared_symbols(&mut locals);
        changes.retain(|symbol| !locals.contains(symbol));
        depends.retain(|symbol| !locals.contains(symbol));
        fun.changes = changes.clone();
        fun.depends = depends.clone();
        self.registry
            .insert(fun.uid.clone(), FnEffects { changes, depends });
    }

    /// Dynamic constructs are only legal on edges, never in function bodies.
    fn check_dynamic_expressions(&mut self, body: &Block) {
        let mut spans = Vec::new();
        body.for_each_expr(&mut |expr| collect_dynamic_spans(expr, &mut spans));
        for span in spans {
            self.error(span, "Dynamic constructs are only allowed on edges!");
        }
    }

    pub fn visit_instance(&mut self, instance: &mut Instance) {
        let ty = instance.uid.ty().clone();
        let unbound = ty.strip().size();
        for i in 0..unbound {
            let parameter = ty.strip().get(i).clone();
            self.check_type(&parameter, false, false);
        }

        for i in unbound..unbound + instance.arguments {
            let parameter = instance.parameters.get(i).clone();
            let Some(argument) = instance.mapping.get_mut(&parameter) else {
                continue;
            };
            if !self.check_expression(argument) {
                continue;
            }
            if argument.changes_any_variable(&self.registry) {
                self.error(argument.span, "$Argument_must_be_side-effect_free");
                continue;
            }

            // Three acceptable shapes: a value parameter with a computable
            // argument, a constant reference with a computable argument, or
            // a reference parameter with a unique l-value argument.
            let reference = parameter.ty().is(TypeKind::Ref);
            let constant = parameter.ty().is_constant();
            let computable = self.is_compile_time_computable(argument);
            let unique = is_unique_reference(argument, &self.computable, &self.registry);
            if (!reference && !computable)
                || (reference && !constant && !unique)
                || (reference && constant && !computable)
            {
                self.error(argument.span, "$Incompatible_argument");
                continue;
            }

            let parameter_ty = parameter.ty().clone();
            self.check_parameter_compatible(&parameter_ty, argument);
        }
    }

    pub fn visit_process(&mut self, process: &mut Instance) {
        for i in 0..process.unbound {
            let parameter = process.parameters.get(i).clone();
            let ty = parameter.ty();
            if !(ty.is_scalar() || ty.is_range()) || ty.is(TypeKind::Ref) {
                self.error(
                    ty.span(),
                    "$Free_process_parameters_must_be_a_bounded_integer_or_a_scalar",
                );
            }
            if process.restricted.contains(&parameter) {
                self.error(
                    ty.span(),
                    "$Free_process_parameters_must_not_be_used_directly_or_indirectly_in_an_array_declaration_or_select_expression",
                );
            }
        }
    }

    pub fn visit_io_decl(&mut self, iodecl: &mut IoDecl) {
        for expr in &mut iodecl.param {
            if self.check_expression(expr) {
                if !is_integer(expr) {
                    self.error(expr.span, "$Integer_expected");
                } else if !self.is_compile_time_computable(expr) {
                    self.error(expr.span, "$Must_be_computable_at_compile_time");
                } else if expr.changes_any_variable(&self.registry) {
                    self.error(expr.span, "$Index_must_be_side-effect_free");
                }
            }
        }

        if self.sync_used == SyncUsage::Unused {
            if !iodecl.inputs.is_empty() || !iodecl.outputs.is_empty() {
                self.sync_used = SyncUsage::Io;
            } else if !iodecl.csp.is_empty() {
                self.sync_used = SyncUsage::Csp;
            }
        }
        match self.sync_used {
            SyncUsage::Io => {
                if !iodecl.csp.is_empty() {
                    self.sync_error = true;
                }
            }
            SyncUsage::Csp => {
                if !iodecl.inputs.is_empty() || !iodecl.outputs.is_empty() {
                    self.sync_error = true;
                }
            }
            SyncUsage::Unused => {}
        }
        if self.sync_error {
            let span = iodecl
                .csp
                .first()
                .or_else(|| iodecl.inputs.first())
                .or_else(|| iodecl.outputs.first())
                .map(|expr| expr.span)
                .unwrap_or_default();
            self.error(span, "$CSP_and_IO_synchronisations_cannot_be_mixed");
        }

        for expr in &mut iodecl.inputs {
            self.check_channel_reference(expr);
        }
        for expr in &mut iodecl.outputs {
            self.check_channel_reference(expr);
        }
    }

    /// A channel (or array-of-channels) reference with compile-time
    /// computable, side-effect free index expressions.
    fn check_channel_reference(&mut self, expr: &mut Expr) {
        if !self.check_expression(expr) {
            return;
        }
        let mut channel = expr.ty.clone();
        while channel.is_array() {
            channel = channel.elem();
        }
        if !channel.is_channel() {
            self.error(expr.span, "$Channel_expected");
        }
        let changes = expr.changes_any_variable(&self.registry);
        let mut walker: &Expr = expr;
        while walker.kind == ExprKind::Index {
            if !self.is_compile_time_computable(walker.get(1)) {
                self.error(walker.get(1).span, "$Must_be_computable_at_compile_time");
            } else if changes {
                self.error(walker.get(1).span, "$Index_must_be_side-effect_free");
            }
            walker = walker.get(0);
        }
    }

    pub fn visit_progress_measure(&mut self, progress: &mut ProgressMeasure) {
        if let Some(guard) = &mut progress.guard {
            self.check_expression(guard);
        }
        self.check_expression(&mut progress.measure);

        if let Some(guard) = &progress.guard {
            if !is_integral(guard) {
                self.error(guard.span, "$Progress_guard_must_evaluate_to_a_boolean");
            }
        }
        if !is_integral(&progress.measure) {
            self.error(
                progress.measure.span,
                "$Progress_measure_must_evaluate_to_a_value",
            );
        }
    }

    pub fn visit_gantt_chart(&mut self, gantt: &mut GanttChart) {
        for symbol in gantt.parameters.iter() {
            self.check_type(symbol.ty(), false, false);
        }
        for map in &mut gantt.mapping {
            for symbol in map.parameters.iter() {
                self.check_type(symbol.ty(), false, false);
            }

            self.check_expression(&mut map.predicate);
            if !is_integral(&map.predicate) && !predicates::is_constraint(&map.predicate) {
                self.error(map.predicate.span, "$Boolean_expected");
            }

            self.check_expression(&mut map.mapping);
            if !is_integral(&map.mapping) {
                self.error(map.mapping.span, "$Integer_expected");
            }
        }
    }

    pub fn visit_instance_line(&mut self, _line: &mut Instance) {
        // Instance lines carry no checkable expressions of their own.
    }

    pub fn visit_message(&mut self, message: &mut crate::ast::Message) {
        if let Some(label) = &mut message.label {
            if self.check_expression(label) {
                let channel = label.get(0).ty.clone();
                if !channel.is_channel() {
                    self.error(label.get(0).span, "$Channel_expected");
                } else if label.changes_any_variable(&self.registry) {
                    self.error(label.span, "$Message_must_be_side-effect_free");
                }
            }
        }
    }

    pub fn visit_condition(&mut self, condition: &mut crate::ast::Condition) {
        if let Some(label) = &mut condition.label {
            if self.check_expression(label) {
                if !is_guard(label) {
                    self.error(
                        label.span,
                        format!(
                            "$Expression_of_type {} $cannot_be_used_as_a_condition",
                            label.ty
                        ),
                    );
                } else if label.changes_any_variable(&self.registry) {
                    self.error(label.span, "$Condition_must_be_side-effect_free");
                }
            }
        }
    }

    pub fn visit_update(&mut self, update: &mut crate::ast::Update) {
        if let Some(label) = &mut update.label {
            self.check_assignment_expression(label);
        }
    }

    pub fn visit_hybrid_clock(&mut self, expr: &mut Expr) {
        if self.check_expression(expr) {
            if !predicates::is_clock(expr) {
                self.error(expr.span, "$Clock_expected");
            } else if expr.changes_any_variable(&self.registry) {
                self.error(expr.span, "$Index_must_be_side-effect_free");
            }
        }
    }

    /// Channel priority declarations, checked once the whole system has
    /// been traversed.
    pub fn visit_system_after(&mut self, priorities: &mut [ChanPriority]) {
        for priority in priorities {
            if let Some(head) = &mut priority.head {
                self.check_channel_reference(head);
            }
            for entry in &mut priority.tail {
                if let Some(expr) = entry {
                    self.check_channel_reference(expr);
                }
            }
        }
    }

    /// Check and normalise an initialiser against the declared type. Record
    /// initialisers are reordered into declared field order; array
    /// initialisers are checked element-wise.
    pub(crate) fn check_initialiser(&mut self, ty: &Type, init: Expr) -> Expr {
        if compat::are_assignment_compatible(ty, &init.ty, true) {
            return init;
        }

        if ty.is_array() && init.kind == ExprKind::List {
            let subtype = ty.elem();
            let init_ty = init.ty.clone();
            let span = init.span;
            let mut result = Vec::with_capacity(init.subs.len());
            for (i, element) in init.subs.into_iter().enumerate() {
                if !init_ty.label(i).is_empty() {
                    self.error(element.span, "$Field_name_not_allowed_in_array_initialiser");
                }
                result.push(self.check_initialiser(&subtype, element));
            }
            return Expr::nary(ExprKind::List, result, span, ty.clone());
        }

        if ty.is_record() || init.kind == ExprKind::List {
            let record_size = ty.record_size();
            let init_ty = init.ty.clone();
            let span = init.span;
            let mut slots: Vec<Option<Expr>> = (0..record_size).map(|_| None).collect();
            let mut current = 0usize;
            for (i, element) in init.subs.iter().enumerate() {
                let label = init_ty.label(i);
                if !label.is_empty() {
                    match ty.find_index_of(label) {
                        Some(index) => current = index,
                        None => {
                            self.error(element.span, "$Unknown_field");
                            break;
                        }
                    }
                }
                if current >= record_size {
                    self.error(element.span, "$Too_many_elements_in_initialiser");
                    break;
                }
                if slots[current].is_some() {
                    self.error(element.span, "$Multiple_initialisers_for_field");
                    current += 1;
                    continue;
                }
                let field = ty.field(current);
                slots[current] = Some(self.check_initialiser(&field, element.clone()));
                current += 1;
            }

            if slots.iter().any(Option::is_none) {
                self.error(span, "$Incomplete_initialiser");
                return init;
            }
            let result: Vec<Expr> = slots.into_iter().flatten().collect();
            return Expr::nary(ExprKind::List, result, span, ty.clone());
        }

        self.error(init.span, "$Invalid_initialiser");
        init
    }
}

fn collect_dynamic_spans(expr: &Expr, out: &mut Vec<Span>) {
    if expr.is_dynamic() {
        out.push(expr.span);
    }
    for sub in &expr.subs {
        collect_dynamic_spans(sub, out);
    }
}
