use super::Visit;
use hcl::{
    template::{Directive, Element},
    Body, Expression, Identifier, Operation, Structure, Template, TemplateExpr, Traversal,
    TraversalOperator,
};

/// Recursively visit all [hcl::Traversal]s
///
/// Traversals rooted at the iterator variables of an enclosing `for` expression or directive are
/// not visited.
pub trait VisitTraversals {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        self.visit_traversals_bound(visitor, &mut vec![]);
    }

    /// `bound` holds the iterator variables in scope
    fn visit_traversals_bound(
        &self,
        visitor: &mut dyn Visit<Traversal>,
        bound: &mut Vec<Identifier>,
    );
}

fn is_bound(bound: &[Identifier], name: &str) -> bool {
    bound.iter().any(|ident| ident.as_str() == name)
}

impl VisitTraversals for Body {
    fn visit_traversals_bound(
        &self,
        visitor: &mut dyn Visit<Traversal>,
        bound: &mut Vec<Identifier>,
    ) {
        for structure in self.iter() {
            match structure {
                Structure::Attribute(attr) => attr.expr.visit_traversals_bound(visitor, bound),
                Structure::Block(block) => block.body.visit_traversals_bound(visitor, bound),
            }
        }
    }
}

impl VisitTraversals for Expression {
    fn visit_traversals_bound(
        &self,
        visitor: &mut dyn Visit<Traversal>,
        bound: &mut Vec<Identifier>,
    ) {
        match self {
            Expression::Variable(variable) => {
                if is_bound(bound, variable.as_str()) {
                    return;
                }
                // a standalone variable is a traversal with no operators...kind of
                let traversal = Traversal::new(
                    Expression::Variable(variable.clone()),
                    Vec::<TraversalOperator>::new(),
                );
                visitor.visit(&traversal);
            }
            Expression::Traversal(traversal) => {
                // `-var.n` comes out as the traversal `(-var).n`
                if let Expression::Operation(operation) = &traversal.expr {
                    if let Operation::Unary(unop) = &**operation {
                        let operand =
                            Traversal::new(unop.expr.clone(), traversal.operators.clone());
                        Expression::from(operand).visit_traversals_bound(visitor, bound);
                        return;
                    }
                }

                // `a.b` as the root of `a.b[0].c`
                if let Expression::Traversal(inner) = &traversal.expr {
                    let operators = inner.operators.iter().chain(&traversal.operators).cloned();
                    let flat = Traversal::new(inner.expr.clone(), operators.collect::<Vec<_>>());
                    Expression::from(flat).visit_traversals_bound(visitor, bound);
                    return;
                }

                match &traversal.expr {
                    Expression::Variable(root) if is_bound(bound, root.as_str()) => {}
                    Expression::Variable(_) => visitor.visit(traversal),
                    expr => expr.visit_traversals_bound(visitor, bound),
                }
                for operator in &traversal.operators {
                    if let TraversalOperator::Index(index) = operator {
                        index.visit_traversals_bound(visitor, bound);
                    }
                }
            }
            Expression::Array(array) => {
                for expr in array {
                    expr.visit_traversals_bound(visitor, bound);
                }
            }
            Expression::Object(object) => {
                for value in object.values() {
                    value.visit_traversals_bound(visitor, bound);
                }
            }
            Expression::TemplateExpr(template_expr) => {
                let template_expr: &TemplateExpr = template_expr;
                if let Ok(template) = Template::from_expr(template_expr) {
                    template.visit_traversals_bound(visitor, bound);
                }
            }
            Expression::FuncCall(func_call) => {
                for arg in &func_call.args {
                    arg.visit_traversals_bound(visitor, bound);
                }
            }
            Expression::Parenthesis(expr) => {
                expr.visit_traversals_bound(visitor, bound);
            }
            Expression::Conditional(cond) => {
                cond.cond_expr.visit_traversals_bound(visitor, bound);
                cond.true_expr.visit_traversals_bound(visitor, bound);
                cond.false_expr.visit_traversals_bound(visitor, bound);
            }
            Expression::Operation(operation) => match &**operation {
                Operation::Binary(binop) => {
                    binop.lhs_expr.visit_traversals_bound(visitor, bound);
                    binop.rhs_expr.visit_traversals_bound(visitor, bound);
                }
                Operation::Unary(unop) => {
                    unop.expr.visit_traversals_bound(visitor, bound);
                }
            },
            Expression::ForExpr(forexpr) => {
                forexpr.collection_expr.visit_traversals_bound(visitor, bound);

                let scope = bound.len();
                bound.extend(forexpr.key_var.iter().cloned());
                bound.push(forexpr.value_var.clone());
                forexpr
                    .key_expr
                    .iter()
                    .for_each(|e| e.visit_traversals_bound(visitor, bound));
                forexpr.value_expr.visit_traversals_bound(visitor, bound);
                forexpr
                    .cond_expr
                    .iter()
                    .for_each(|e| e.visit_traversals_bound(visitor, bound));
                bound.truncate(scope);
            }
            _ => {}
        }
    }
}

impl VisitTraversals for Template {
    fn visit_traversals_bound(
        &self,
        visitor: &mut dyn Visit<Traversal>,
        bound: &mut Vec<Identifier>,
    ) {
        for element in self.elements() {
            match element {
                Element::Interpolation(interpolation) => {
                    interpolation.expr.visit_traversals_bound(visitor, bound);
                }
                Element::Directive(directive) => match directive {
                    Directive::If(ifdir) => {
                        ifdir.cond_expr.visit_traversals_bound(visitor, bound);
                        ifdir.true_template.visit_traversals_bound(visitor, bound);
                        ifdir
                            .false_template
                            .iter()
                            .for_each(|t| t.visit_traversals_bound(visitor, bound));
                    }
                    Directive::For(fordir) => {
                        fordir.collection_expr.visit_traversals_bound(visitor, bound);

                        let scope = bound.len();
                        bound.extend(fordir.key_var.iter().cloned());
                        bound.push(fordir.value_var.clone());
                        fordir.template.visit_traversals_bound(visitor, bound);
                        bound.truncate(scope);
                    }
                },
                Element::Literal(_) => {}
            }
        }
    }
}
