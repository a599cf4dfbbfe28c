//! Well-formedness of declared types.
//!
//! Walks a declared type tree and verifies prefix legality, that range
//! bounds are compile-time computable integers, that array sizes are
//! ranges, and the record field rules. `initialisable` is forced on below a
//! `const` or `meta` prefix: a kind that cannot hold an initial value is
//! rejected there.

use crate::check::predicates::is_integer;
use crate::check::TypeChecker;
use crate::foundation::{Type, TypeKind};

impl TypeChecker {
    pub(crate) fn check_type(&mut self, ty: &Type, initialisable: bool, in_struct: bool) {
        match ty.kind() {
            TypeKind::Label => self.check_type(ty.get(0), initialisable, in_struct),

            TypeKind::Urgent => {
                if !ty.is_location() && !ty.is_channel() {
                    self.error(
                        ty.span(),
                        "$Prefix_urgent_only_allowed_for_locations_and_channels",
                    );
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Broadcast => {
                if !ty.is_channel() {
                    self.error(ty.span(), "$Prefix_broadcast_only_allowed_for_channels");
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Committed => {
                if !ty.is_location() {
                    self.error(ty.span(), "$Prefix_committed_only_allowed_for_locations");
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Hybrid => {
                if !ty.is_clock() && !(ty.is_array() && ty.strip_array().is_clock()) {
                    self.error(ty.span(), "$Prefix_hybrid_only_allowed_for_clocks");
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Const => {
                if ty.is_clock() {
                    self.error(ty.span(), "$Prefix_const_not_allowed_for_clocks");
                }
                self.check_type(ty.get(0), true, in_struct);
            }

            TypeKind::SystemMeta => {
                if ty.is_clock() {
                    self.error(ty.span(), "$Prefix_meta_not_allowed_for_clocks");
                }
                self.check_type(ty.get(0), true, in_struct);
            }

            TypeKind::Ref => {
                if !ty.is_integral()
                    && !ty.is_array()
                    && !ty.is_record()
                    && !ty.is_channel()
                    && !ty.is_clock()
                    && !ty.is_scalar()
                    && !ty.is_double()
                {
                    self.error(ty.span(), "$Reference_to_this_type_not_allowed");
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Range => {
                if !ty.is_integer() && !ty.is_scalar() {
                    self.error(ty.span(), "$Range_over_this_type_not_allowed");
                }
                let bounds = ty
                    .bounds()
                    .map(|(lower, upper)| (lower.clone(), upper.clone()));
                if let Some((lower, upper)) = bounds {
                    for mut bound in [lower, upper] {
                        if self.check_expression(&mut bound) {
                            if !is_integer(&bound) {
                                self.error(bound.span, "$Integer_expected");
                            }
                            if !self.is_compile_time_computable(&bound) {
                                self.error(bound.span, "$Must_be_computable_at_compile_time");
                            }
                        }
                    }
                }
            }

            TypeKind::Array => {
                let size = ty.array_size();
                if !size.is(TypeKind::Range) {
                    self.error(ty.span(), "$Invalid_array_size");
                } else {
                    self.check_type(&size, false, false);
                }
                self.check_type(ty.get(0), initialisable, in_struct);
            }

            TypeKind::Record => {
                for i in 0..ty.size() {
                    self.check_type(ty.get(i), true, true);
                }
            }

            TypeKind::Double => {
                if in_struct {
                    self.error(ty.span(), "$This_type_cannot_be_declared_inside_a_struct");
                }
            }

            TypeKind::Int | TypeKind::Bool => {}

            _ => {
                if initialisable {
                    self.error(ty.span(), "$This_type_cannot_be_declared_const_or_meta");
                }
            }
        }
    }
}
