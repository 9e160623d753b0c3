use crate::filter::{
    node::{ExistsFilter, Filter, FilterNode, PropertyFilter},
    visitor::FilterVisitor,
};
use std::mem;

const INDENT: &str = "  ";

///
/// ExplainState
///

#[derive(Default)]
struct ExplainState {
    out: String,
    depth: usize,
}

impl ExplainState {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

///
/// Explain
///
/// Renders one node per line; junction runs are flattened under a single
/// header.
///

struct Explain;

impl Explain {
    fn junction(&mut self, filter: &Filter, label: &str, cx: &mut ExplainState) {
        let mut operands = Vec::new();
        collect_run(filter, &mut operands);

        cx.line(label);
        cx.depth += 1;
        for operand in operands {
            operand.accept(self, cx);
        }
        cx.depth -= 1;
    }
}

impl FilterVisitor for Explain {
    type Context = ExplainState;
    type Output = ();

    fn visit_open(&mut self, _: &Filter, cx: &mut ExplainState) {
        cx.line("OPEN");
    }

    fn visit_closed(&mut self, _: &Filter, cx: &mut ExplainState) {
        cx.line("CLOSED");
    }

    fn visit_property(&mut self, filter: &Filter, _: &PropertyFilter, cx: &mut ExplainState) {
        cx.line(&filter.to_string());
    }

    fn visit_exists(&mut self, _: &Filter, exists: &ExistsFilter, cx: &mut ExplainState) {
        let prefix = if exists.is_negated() { "NOT " } else { "" };
        cx.line(&format!("{prefix}EXISTS {}", exists.chain()));

        if !exists.sub_filter().is_open() {
            cx.depth += 1;
            exists.sub_filter().accept(self, cx);
            cx.depth -= 1;
        }
    }

    fn visit_and(&mut self, filter: &Filter, _: &Filter, _: &Filter, cx: &mut ExplainState) {
        self.junction(filter, "AND", cx);
    }

    fn visit_or(&mut self, filter: &Filter, _: &Filter, _: &Filter, cx: &mut ExplainState) {
        self.junction(filter, "OR", cx);
    }
}

fn collect_run(filter: &Filter, out: &mut Vec<Filter>) {
    match filter.node() {
        FilterNode::And(left, right) | FilterNode::Or(left, right) => {
            for child in [left, right] {
                if mem::discriminant(child.node()) == mem::discriminant(filter.node()) {
                    collect_run(child, out);
                } else {
                    out.push(child.clone());
                }
            }
        }
        _ => out.push(filter.clone()),
    }
}

impl Filter {
    /// Indented multi-line rendering, one node per line.
    #[must_use]
    pub fn explain(&self) -> String {
        let mut state = ExplainState::default();
        self.accept(&mut Explain, &mut state);

        state.out
    }
}

///
/// TESTS
///
