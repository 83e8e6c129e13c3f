//! Property tests for the tokenizer and parser.
//!
//! 1. The tokenizer never panics and either fails or ends with exactly one EOF
//! 2. Compiling is deterministic
//! 3. Generated policies always compile
//! 4. Route targets appear exactly on `route` actions
//! 5. Canonical rendering compiles back to the same tree

use proptest::prelude::*;

use plang::ast::{ActionBlock, Expr, ExprKind, PolicyItem, RuleItem, Statement, Verdict};
use plang::{Action, Program, Span, TokenType, compile, tokenize};

// ============================================================================
// Generators
// ============================================================================

fn identifier() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["request", "tenant", "cost", "flagged", "user_1", "_ctx"])
        .prop_map(str::to_string)
}

fn literal() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,30}\\.[0-9]{1,30}",
        (0u32..100_000).prop_map(|n| n.to_string()),
        (0u32..1000, 0u32..100).prop_map(|(a, b)| format!("{a}.{b}")),
        Just("true".to_string()),
        Just("false".to_string()),
        "[a-z /._-]{0,12}".prop_map(|s| format!("\"{s}\"")),
    ]
}

/// identifier, attribute chain or call
fn chain() -> impl Strategy<Value = String> {
    (identifier(), prop::collection::vec(identifier(), 0..3), any::<bool>()).prop_map(
        |(head, attrs, call)| {
            let mut out = head;
            for attr in attrs {
                out.push('.');
                out.push_str(&attr);
            }
            if call {
                out.push_str("(request)");
            }
            out
        },
    )
}

fn value() -> impl Strategy<Value = String> {
    prop_oneof![literal(), chain()]
}

fn comparison() -> impl Strategy<Value = String> {
    let op = prop::sample::select(vec!["==", "!=", "<", ">", "<=", ">="]);
    prop_oneof![
        value(),
        (value(), op, value()).prop_map(|(l, op, r)| format!("{l} {op} {r}")),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    comparison().prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} and {b}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} or {b}")),
            inner.clone().prop_map(|a| format!("not {a}")),
            inner.prop_map(|a| format!("({a})")),
        ]
    })
}

fn action() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("deny".to_string()),
        Just("allow".to_string()),
        Just("escalate".to_string()),
        identifier().prop_map(|t| format!("route to {t}")),
    ]
}

fn rule_item() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1000).prop_map(|n| format!("priority {n}")),
        (expression(), action()).prop_map(|(e, a)| format!("when {e} then {a}")),
        action(),
    ]
}

fn category() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["safety", "privacy", "operational", "routing", "custom", "SAFETY"])
}

fn rule_decl() -> impl Strategy<Value = String> {
    (identifier(), category(), prop::collection::vec(rule_item(), 0..4))
        .prop_map(|(name, cat, items)| format!("rule {name} : {cat} {{ {} }}", items.join("\n")))
}

fn policy_item() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => rule_item(),
        1 => identifier().prop_map(|n| format!("rule {n}")),
        1 => rule_decl(),
    ]
}

fn document() -> impl Strategy<Value = String> {
    let policy = (identifier(), category(), prop::collection::vec(policy_item(), 0..5))
        .prop_map(|(name, cat, items)| {
            format!("policy {name} : {cat} {{\n{}\n}}", items.join("\n"))
        });
    let import = "[a-z/]{1,10}".prop_map(|p| format!("import \"{p}.plang\""));
    let statement = prop_oneof![3 => policy, 1 => rule_decl(), 1 => import];
    prop::collection::vec(statement, 0..4).prop_map(|s| s.join("\n\n"))
}

// ============================================================================
// Helpers
// ============================================================================

fn action_blocks(program: &Program) -> Vec<&ActionBlock> {
    fn from_rule<'a>(items: &'a [RuleItem], out: &mut Vec<&'a ActionBlock>) {
        for item in items {
            match item {
                RuleItem::Action(a) => out.push(a),
                RuleItem::Condition(c) => out.push(&c.action),
                RuleItem::Priority(_) => {}
            }
        }
    }

    let mut out = Vec::new();
    for statement in &program.statements {
        match statement {
            Statement::Rule(rule) => from_rule(&rule.body, &mut out),
            Statement::Policy(policy) => {
                for item in &policy.body {
                    match item {
                        PolicyItem::Rule(rule) => from_rule(&rule.body, &mut out),
                        PolicyItem::Action(a) => out.push(a),
                        PolicyItem::Condition(c) => out.push(&c.action),
                        PolicyItem::RuleRef(_) | PolicyItem::Priority(_) => {}
                    }
                }
            }
            Statement::Import(_) => {}
        }
    }
    out
}

/// Resets every position so trees from different sources compare by shape.
fn without_spans(mut program: Program) -> Program {
    fn expr(e: &mut Expr) {
        e.span = Span::default();
        match &mut e.kind {
            ExprKind::BinaryOp { left, right, .. } => {
                expr(left);
                expr(right);
            }
            ExprKind::UnaryOp { operand, .. } => expr(operand),
            ExprKind::AttrAccess { object, .. } => expr(object),
            ExprKind::FuncCall { callee, args } => {
                expr(callee);
                args.iter_mut().for_each(expr);
            }
            ExprKind::Literal(_) | ExprKind::Ident(_) => {}
        }
    }

    fn action(a: &mut ActionBlock) {
        a.span = Span::default();
        if let Verdict::Route(target) = &mut a.verdict {
            target.span = Span::default();
        }
    }

    fn rule_items(items: &mut [RuleItem]) {
        for item in items {
            match item {
                RuleItem::Priority(p) => p.span = Span::default(),
                RuleItem::Action(a) => action(a),
                RuleItem::Condition(c) => {
                    c.span = Span::default();
                    expr(&mut c.condition);
                    action(&mut c.action);
                }
            }
        }
    }

    program.span = Span::default();
    for statement in &mut program.statements {
        match statement {
            Statement::Import(i) => i.span = Span::default(),
            Statement::Rule(r) => {
                r.span = Span::default();
                rule_items(&mut r.body);
            }
            Statement::Policy(policy) => {
                policy.span = Span::default();
                for item in &mut policy.body {
                    match item {
                        PolicyItem::RuleRef(r) => r.span = Span::default(),
                        PolicyItem::Priority(p) => p.span = Span::default(),
                        PolicyItem::Action(a) => action(a),
                        PolicyItem::Rule(r) => {
                            r.span = Span::default();
                            rule_items(&mut r.body);
                        }
                        PolicyItem::Condition(c) => {
                            c.span = Span::default();
                            expr(&mut c.condition);
                            action(&mut c.action);
                        }
                    }
                }
            }
        }
    }
    program
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn tokenize_ends_with_single_eof(source in any::<String>()) {
        if let Ok(tokens) = tokenize(&source) {
            prop_assert!(!tokens.is_empty());
            prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenType::Eof));
            prop_assert_eq!(tokens.iter().filter(|t| t.kind == TokenType::Eof).count(), 1);
        }
    }

    #[test]
    fn token_positions_never_decrease(source in "[a-z0-9 \n(){}:.,<>=\"#]{0,80}") {
        if let Ok(tokens) = tokenize(&source) {
            for pair in tokens.windows(2) {
                let before = (pair[0].span.line, pair[0].span.column);
                let after = (pair[1].span.line, pair[1].span.column);
                prop_assert!(before < after || pair[1].kind == TokenType::Eof);
                prop_assert!(pair[0].span.end <= pair[1].span.start);
            }
        }
    }

    #[test]
    fn compile_is_deterministic(source in "[a-z0-9 \n(){}:.,<>=\"]{0,120}") {
        prop_assert_eq!(compile(&source), compile(&source));
    }

    #[test]
    fn generated_documents_compile(source in document()) {
        let first = compile(&source);
        prop_assert!(first.is_ok(), "{:?}\n{}", first, source);
        prop_assert_eq!(first, compile(&source));
    }

    #[test]
    fn route_target_iff_route_action(source in document()) {
        let program = compile(&source).unwrap();
        for block in action_blocks(&program) {
            prop_assert_eq!(block.target().is_some(), block.action() == Action::Route);
        }
    }

    #[test]
    fn canonical_rendering_compiles_to_same_tree(source in document()) {
        let program = compile(&source).unwrap();
        let rendered = program.to_string();
        let reparsed = compile(&rendered).unwrap();
        prop_assert_eq!(reparsed.to_string(), rendered);
        prop_assert_eq!(without_spans(reparsed), without_spans(program));
    }
}
