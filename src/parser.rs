use crate::{
    ast::{Block, BlockKind, ComponentRef, Node},
    error::{CurlyError, CurlyResult},
    scanner::Token,
};

/// An open block on the parse stack.
struct Frame {
    block: Block,
    /// Set once `{{else}}` has been seen; nodes then go to the else body.
    in_else: bool,
}

struct Parser {
    root: Vec<Node>,
    stack: Vec<Frame>,
}

impl Parser {
    const fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// The node list currently being appended to.
    fn tree(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(Frame {
                block,
                in_else: true,
            }) => &mut block.else_body,
            Some(Frame {
                block,
                in_else: false,
            }) => &mut block.body,
            None => &mut self.root,
        }
    }

    fn parse(mut self, tokens: Vec<Token>) -> CurlyResult<Vec<Node>> {
        for token in tokens {
            match token {
                Token::Text(value) => self.tree().push(Node::Text(value)),
                Token::Comment(value) => self.tree().push(Node::Comment(value)),
                Token::Component(component) => self.parse_component(component),
                Token::ConditionalBlockStart(component) => {
                    self.open_block(BlockKind::Conditional, component);
                }
                Token::InverseConditionalBlockStart(component) => {
                    self.open_block(BlockKind::InverseConditional, component);
                }
                Token::CollectionBlockStart(component) => {
                    self.open_block(BlockKind::Collection, component);
                }
                Token::ContextBlockStart(component) => {
                    self.open_block(BlockKind::Context, component);
                }
                Token::Else => self.parse_else()?,
                Token::ConditionalBlockEnd => {
                    self.close_kind(BlockKind::Conditional, "if")?;
                }
                Token::InverseConditionalBlockEnd => {
                    self.close_kind(BlockKind::InverseConditional, "unless")?;
                }
                Token::BlockEnd(component) => self.close_block(&component)?,
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(CurlyError::IncompleteBlock {
                component: frame.block.component.to_string(),
            });
        }

        Ok(self.root)
    }

    fn push(&mut self, kind: BlockKind, component: ComponentRef) {
        self.stack.push(Frame {
            block: Block::new(kind, component),
            in_else: false,
        });
    }

    /// Pops the innermost block and appends it to its parent.
    fn pop(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.tree().push(Node::Block(frame.block));
        }
    }

    fn open_contexts(&mut self, contexts: &[String]) {
        for context in contexts {
            self.push(BlockKind::Context, ComponentRef::new(context.as_str()));
        }
    }

    /// `{{a:b:name}}` is shorthand for `{{@a}}{{@b}}{{name}}{{/b}}{{/a}}`.
    fn parse_component(&mut self, mut component: ComponentRef) {
        let contexts = std::mem::take(&mut component.contexts);
        self.open_contexts(&contexts);
        self.tree().push(Node::Component(component));
        for _ in &contexts {
            self.pop();
        }
    }

    fn open_block(&mut self, kind: BlockKind, component: ComponentRef) {
        self.open_contexts(&component.contexts);
        self.push(kind, component);
    }

    fn parse_else(&mut self) -> CurlyResult<()> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| CurlyError::compile("an else needs to be in a proper block"))?;

        if !frame.block.kind.accepts_else() {
            return Err(CurlyError::compile(format!(
                "`{}` does not accept an else",
                frame.block.component
            )));
        }
        if frame.in_else {
            return Err(CurlyError::compile(format!(
                "`{}` already has an else",
                frame.block.component
            )));
        }

        frame.in_else = true;
        Ok(())
    }

    /// Handles the payload-free `{{/if}}` and `{{/unless}}` ends.
    fn close_kind(&mut self, kind: BlockKind, actual: &str) -> CurlyResult<()> {
        let Some(frame) = self.stack.last() else {
            return Err(CurlyError::IncorrectEnding {
                expected: None,
                actual: actual.to_string(),
            });
        };

        if frame.block.kind != kind {
            return Err(CurlyError::IncorrectEnding {
                expected: Some(frame.block.component.to_string()),
                actual: actual.to_string(),
            });
        }

        let contexts = frame.block.component.contexts.clone();
        self.pop();
        self.close_contexts(&contexts)
    }

    fn close_block(&mut self, component: &ComponentRef) -> CurlyResult<()> {
        let Some(frame) = self.stack.last() else {
            return Err(CurlyError::IncorrectEnding {
                expected: None,
                actual: component.to_string(),
            });
        };

        if !frame.block.component.same_block(component) {
            return Err(CurlyError::IncorrectEnding {
                expected: Some(frame.block.component.to_string()),
                actual: component.to_string(),
            });
        }

        self.pop();
        self.close_contexts(&component.contexts)
    }

    /// Closes the synthetic context blocks opened for a namespaced block.
    fn close_contexts(&mut self, contexts: &[String]) -> CurlyResult<()> {
        for context in contexts.iter().rev() {
            self.close_block(&ComponentRef::new(context.as_str()))?;
        }
        Ok(())
    }
}

/// Builds the block-nested AST from a token stream.
///
/// # Errors
/// - [`CurlyError::IncorrectEnding`] when an end tag does not match the
///   innermost open block, or no block is open.
/// - [`CurlyError::IncompleteBlock`] when blocks remain open at the end.
/// - [`CurlyError::Compile`] for a misplaced `{{else}}`.
pub fn parse(tokens: Vec<Token>) -> CurlyResult<Vec<Node>> {
    Parser::new().parse(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> ComponentRef {
        ComponentRef::new(name)
    }

    fn block(kind: BlockKind, name: &str, body: Vec<Node>, else_body: Vec<Node>) -> Node {
        Node::Block(Block {
            kind,
            component: component(name),
            body,
            else_body,
        })
    }

    fn hello() -> Node {
        Node::Component(component("hello"))
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_component_tokens() {
        let nodes = parse(vec![Token::Component(component("a"))]).unwrap();
        assert_eq!(nodes, vec![Node::Component(component("a"))]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_conditional_blocks() {
        let tokens = vec![
            Token::ConditionalBlockStart(component("a?")),
            Token::Component(component("hello")),
            Token::BlockEnd(component("a?")),
        ];
        assert_eq!(
            parse(tokens).unwrap(),
            vec![block(BlockKind::Conditional, "a?", vec![hello()], vec![])]
        );

        let tokens = vec![
            Token::ConditionalBlockStart(component("a?")),
            Token::Component(component("hello")),
            Token::ConditionalBlockEnd,
        ];
        assert_eq!(
            parse(tokens).unwrap(),
            vec![block(BlockKind::Conditional, "a?", vec![hello()], vec![])]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_else_in_conditionals() {
        for (start, kind) in [
            (
                Token::ConditionalBlockStart(component("bar?")),
                BlockKind::Conditional,
            ),
            (
                Token::InverseConditionalBlockStart(component("bar?")),
                BlockKind::InverseConditional,
            ),
        ] {
            let tokens = vec![
                start,
                Token::Component(component("hello")),
                Token::Else,
                Token::Component(component("bye")),
                Token::BlockEnd(component("bar?")),
            ];
            assert_eq!(
                parse(tokens).unwrap(),
                vec![block(
                    kind,
                    "bar?",
                    vec![hello()],
                    vec![Node::Component(component("bye"))]
                )]
            );
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_else_in_collections() {
        let tokens = vec![
            Token::CollectionBlockStart(component("mice")),
            Token::Text("a".to_string()),
            Token::Else,
            Token::Text("none".to_string()),
            Token::BlockEnd(component("mice")),
        ];
        assert_eq!(
            parse(tokens).unwrap(),
            vec![block(
                BlockKind::Collection,
                "mice",
                vec![Node::Text("a".to_string())],
                vec![Node::Text("none".to_string())]
            )]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_misplaced_else() {
        assert!(matches!(
            parse(vec![Token::Else]),
            Err(CurlyError::Compile { .. })
        ));

        let tokens = vec![
            Token::ContextBlockStart(component("form")),
            Token::Else,
            Token::BlockEnd(component("form")),
        ];
        assert!(matches!(parse(tokens), Err(CurlyError::Compile { .. })));

        let tokens = vec![
            Token::ConditionalBlockStart(component("a?")),
            Token::Else,
            Token::Else,
            Token::BlockEnd(component("a?")),
        ];
        assert!(matches!(parse(tokens), Err(CurlyError::Compile { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_incomplete_block() {
        let err = parse(vec![Token::CollectionBlockStart(component("mice"))]).unwrap_err();
        assert_eq!(
            err,
            CurlyError::IncompleteBlock {
                component: "mice".to_string()
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_block_closed_with_wrong_component() {
        let tokens = vec![
            Token::CollectionBlockStart(component("mice")),
            Token::BlockEnd(component("men")),
        ];
        assert_eq!(
            parse(tokens).unwrap_err(),
            CurlyError::IncorrectEnding {
                expected: Some("mice".to_string()),
                actual: "men".to_string(),
            }
        );

        let tokens = vec![
            Token::CollectionBlockStart(component("mice").with_identifier("x")),
            Token::BlockEnd(component("mice").with_identifier("y")),
        ];
        assert!(matches!(
            parse(tokens),
            Err(CurlyError::IncorrectEnding { .. })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_conditional_end_must_match_kind() {
        let tokens = vec![
            Token::CollectionBlockStart(component("mice")),
            Token::ConditionalBlockEnd,
        ];
        assert!(matches!(
            parse(tokens),
            Err(CurlyError::IncorrectEnding { .. })
        ));

        let tokens = vec![
            Token::ConditionalBlockStart(component("a?")),
            Token::InverseConditionalBlockEnd,
        ];
        assert!(matches!(
            parse(tokens),
            Err(CurlyError::IncorrectEnding { .. })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_closing_unopened_block() {
        assert_eq!(
            parse(vec![Token::BlockEnd(component("goodbye?"))]).unwrap_err(),
            CurlyError::IncorrectEnding {
                expected: None,
                actual: "goodbye?".to_string(),
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_attributes_do_not_affect_block_identity() {
        let tokens = vec![
            Token::CollectionBlockStart(component("items").with_attribute("status", "active")),
            Token::BlockEnd(component("items")),
        ];
        assert!(parse(tokens).is_ok());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_namespaced_component_expands_to_context_chain() {
        let tokens = vec![Token::Component(
            component("leaf").with_contexts(["tree", "branch"]),
        )];
        assert_eq!(
            parse(tokens).unwrap(),
            vec![block(
                BlockKind::Context,
                "tree",
                vec![block(
                    BlockKind::Context,
                    "branch",
                    vec![Node::Component(component("leaf"))],
                    vec![]
                )],
                vec![]
            )]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_namespaced_block_must_close_with_namespaces() {
        let start = component("branch").with_contexts(["tree"]);

        let tokens = vec![
            Token::ContextBlockStart(start.clone()),
            Token::BlockEnd(component("branch")),
            Token::BlockEnd(component("tree")),
        ];
        assert!(matches!(
            parse(tokens),
            Err(CurlyError::IncorrectEnding { .. })
        ));

        let tokens = vec![
            Token::ContextBlockStart(start.clone()),
            Token::BlockEnd(start.clone()),
        ];
        assert_eq!(
            parse(tokens).unwrap(),
            vec![block(
                BlockKind::Context,
                "tree",
                vec![Node::Block(Block::new(BlockKind::Context, start))],
                vec![]
            )]
        );
    }
}
