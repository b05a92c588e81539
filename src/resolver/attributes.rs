//! Attribute application (§4.R "Attribute application", §4.I "Intrinsic/
//! attribute registration"). Unknown attributes are a warning, not an error
//! (§4.R): the declaration still resolves, just without whatever effect the
//! attribute would have had.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::symbol::Symbol;
use crate::types::decl::{Attribute, FunctionBody, FunctionFlags, VariableDecl};
use crate::types::entity::AttributeKind;

/// Applies every attribute on `body` to its flags, folding `symbol_name`
/// overrides directly into `body.symbol_name`.
pub fn apply_to_function(body: &mut FunctionBody, sink: &mut DiagnosticSink) {
    let attributes = std::mem::take(&mut body.attributes);
    for attr in &attributes {
        match AttributeKind::from_symbol(attr.name) {
            Some(AttributeKind::Builtin) => body.flags.insert(FunctionFlags::INTRINSIC),
            Some(AttributeKind::BuiltinAssign) => body.flags.insert(FunctionFlags::BUILTIN_ASSIGN),
            Some(AttributeKind::NoComptimeChecking) => body.flags.insert(FunctionFlags::NO_COMPTIME_CHECKING),
            Some(AttributeKind::Extern) => body.flags.insert(FunctionFlags::EXTERNAL_LINKAGE),
            Some(AttributeKind::SymbolName) => {
                if let Some(name) = string_arg(attr) {
                    body.symbol_name = name;
                }
            }
            Some(AttributeKind::ComptimeErrorChecking | AttributeKind::NoRuntimeEmit | AttributeKind::MaybeUnused) => {
                // Recognised, but consumed entirely by the consteval/codegen
                // stages downstream; nothing to flip on `FunctionFlags` here.
            }
            None => report_unknown(attr.name, attr.src_tokens, sink),
        }
    }
    body.attributes = attributes;
}

/// Variables only recognise a narrow subset of attributes (§4.R): anything
/// affecting linkage/emission rather than a function's own flags.
pub fn apply_to_variable(decl: &mut VariableDecl, sink: &mut DiagnosticSink) {
    let attributes = std::mem::take(&mut decl.attributes);
    for attr in &attributes {
        match AttributeKind::from_symbol(attr.name) {
            Some(AttributeKind::Extern | AttributeKind::MaybeUnused | AttributeKind::SymbolName) => {}
            Some(other) => report_unknown_as_misplaced(attr.name, other, attr.src_tokens, sink),
            None => report_unknown(attr.name, attr.src_tokens, sink),
        }
    }
    decl.attributes = attributes;
}

fn string_arg(attr: &Attribute) -> Option<Symbol> {
    attr.args.first().and_then(|e| e.constant_value()).and_then(|v| match v {
        crate::types::constant_value::ConstantValue::String(s) => Some(crate::symbol::intern(s.as_ref())),
        _ => None,
    })
}

fn report_unknown(name: Symbol, src: crate::diagnostics::SrcTokens, sink: &mut DiagnosticSink) {
    sink.report(Diagnostic::new(DiagnosticKind::UnknownAttribute { name: name.as_str().to_owned() }, src));
}

fn report_unknown_as_misplaced(name: Symbol, _kind: AttributeKind, src: crate::diagnostics::SrcTokens, sink: &mut DiagnosticSink) {
    sink.report(Diagnostic::new(
        DiagnosticKind::AttributeError { reason: format!("'{}' is not valid on a variable declaration", name.as_str()) },
        src,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::TokenRange;
    use crate::symbol::intern;
    use crate::types::decl::ResolveState;
    use crate::types::typespec::{CallingConvention, Typespec};

    fn fn_body() -> FunctionBody {
        FunctionBody {
            symbol_name: intern("f"),
            params: Vec::new(),
            return_type: Typespec::void(),
            cc: CallingConvention::Fast,
            body_tokens: Some(TokenRange::new(0, 0)),
            body: None,
            flags: FunctionFlags::empty(),
            generic_specializations: Vec::new(),
            generic_parent: None,
            constructor_or_destructor_of: None,
            attributes: Vec::new(),
            resolve_state: ResolveState::Symbol,
        }
    }

    #[test]
    fn builtin_attribute_sets_intrinsic_flag() {
        let mut body = fn_body();
        body.attributes.push(Attribute { name: intern("__builtin"), args: Vec::new(), src_tokens: crate::diagnostics::SrcTokens::point(0, 0) });
        let mut sink = DiagnosticSink::new();
        apply_to_function(&mut body, &mut sink);
        assert!(body.flags.contains(FunctionFlags::INTRINSIC));
        assert!(!sink.has_errors());
    }

    #[test]
    fn unknown_attribute_is_a_warning_not_an_error() {
        let mut body = fn_body();
        body.attributes.push(Attribute { name: intern("not_a_real_attribute"), args: Vec::new(), src_tokens: crate::diagnostics::SrcTokens::point(0, 0) });
        let mut sink = DiagnosticSink::new();
        apply_to_function(&mut body, &mut sink);
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(!sink.has_errors());
    }
}
