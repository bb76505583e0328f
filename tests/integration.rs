
use curly::{
    CurlyError, CurlyInterface, Evaluator, NullContext, Options, Token, Value, compile, render,
    scan, valid,
};
use fixtures::{
    generate_random_text, generate_random_whitespace, get_engine, get_presenter, options,
};

fn render_source(source: &str, options: Options) -> Result<String, CurlyError> {
    let program = compile(source, &get_presenter())?;
    render(&program, options)
}

fn render_plain(source: &str) -> String {
    render_source(source, Options::new()).unwrap()
}

#[test]
#[ntest::timeout(100)]
fn test_basic_substitution() {
    assert_eq!(
        render_plain("{{title}}"),
        "A Clockwork Orange",
        "component results should be substituted"
    );
    assert_eq!(
        render_plain("<h1>{{title}}</h1>"),
        "<h1>A Clockwork Orange</h1>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_identifier_is_passed_to_component() {
    assert_eq!(render_plain("{{reverse.123}}"), "321");
    assert_eq!(render_plain("{{greet}} {{greet.Alex}}"), "Hello, World! Hello, Alex!");
}

#[test]
#[ntest::timeout(100)]
fn test_attributes_are_passed_to_component() {
    assert_eq!(
        render_plain("{{label text=\"Your <name>\" for='name'}}"),
        "<label for=\"name\">Your &lt;name&gt;</label>"
    );
    assert_eq!(
        render_plain("{{label text=Name}}"),
        "<label for=\"\">Name</label>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_conditional_blocks() {
    assert_eq!(render_plain("{{#false?}}x{{/false?}}"), "");
    assert_eq!(render_plain("{{#true?}}x{{/true?}}"), "x");
    assert_eq!(render_plain("{{#if true?}}x{{/if}}"), "x");
    assert_eq!(render_plain("{{^false?}}x{{/false?}}"), "x");
    assert_eq!(render_plain("{{#unless true?}}x{{/unless}}"), "");
    assert_eq!(
        render_plain("{{#false?}}yes{{else}}no{{/false?}}"),
        "no",
        "the else branch runs for a falsy result"
    );
    assert_eq!(render_plain("{{^true?}}yes{{else}}no{{/true?}}"), "no");
}

#[test]
#[ntest::timeout(100)]
fn test_collection_blocks() {
    let opts = options([("items", vec!["one", "two", "three"])]);
    assert_eq!(
        render_source("{{*items}}<{{name}}>{{/items}}", opts).unwrap(),
        "<one><two><three>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_collection_counter() {
    let opts = options([("items", vec!["a", "b"])]);
    assert_eq!(
        render_source("{{*items}}{{position}}:{{name}} {{/items}}", opts).unwrap(),
        "1:a 2:b "
    );
}

#[test]
#[ntest::timeout(100)]
fn test_collection_else_and_singleton() {
    let source = "{{*items}}<{{name}}>{{else}}empty{{/items}}";
    assert_eq!(
        render_source(source, options([("items", Value::List(vec![]))])).unwrap(),
        "empty"
    );
    assert_eq!(render_source(source, Options::new()).unwrap(), "empty");
    assert_eq!(
        render_source(source, options([("items", "only")])).unwrap(),
        "<only>",
        "a single value should be treated as a one-item list"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_nested_collections_see_parent_options() {
    let companies = Value::List(vec![
        [
            ("name", Value::from("Acme")),
            ("employees", Value::from(vec!["Ann", "Bob"])),
        ]
        .into_iter()
        .collect(),
        [
            ("name", Value::from("Initech")),
            ("employees", Value::from(vec!["Cy"])),
        ]
        .into_iter()
        .collect(),
    ]);

    let source = "{{*companies}}{{name}}:{{*employees}} {{name}}@{{company_name}}{{/employees}};{{/companies}}";
    assert_eq!(
        render_source(source, options([("companies", companies)])).unwrap(),
        "Acme: Ann@Acme Bob@Acme;Initech: Cy@Initech;"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_context_blocks() {
    assert_eq!(
        render_plain("{{@form}}{{field.title}}{{submit}}{{/form}}"),
        "<form><input name=\"post[title]\"><button></form>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_namespaced_components() {
    assert_eq!(
        render_plain("{{form:field.body}}"),
        "<form><input name=\"post[body]\"></form>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_yield_propagates_to_caller() {
    let program = compile("{{title}} {{layout}}", &get_presenter()).unwrap();
    let mut block = |_: Value| -> Result<Value, CurlyError> { Ok(Value::from("<hello>")) };
    let output = Evaluator::new(&program)
        .with_context(std::rc::Rc::new(NullContext))
        .with_block(&mut block)
        .evaluate(Options::new())
        .unwrap();
    assert_eq!(output, "A Clockwork Orange <main>&lt;hello&gt;</main>");
}

#[test]
#[ntest::timeout(100)]
fn test_escaping() {
    assert_eq!(render_plain("{{dirty}}"), "&lt;p&gt;dirty&lt;/p&gt;");
    assert_eq!(
        render_plain("{{clean}}"),
        "<p>clean</p>",
        "safe values must not be escaped twice"
    );
    assert_eq!(
        render_plain("<script>{{! ignored }}</script>"),
        "<script></script>",
        "template text is never escaped"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_escaped_delimiter() {
    assert_eq!(render_plain("{{{title}}"), "{{title}}");
}

#[test]
#[ntest::timeout(100)]
fn test_comments_are_discarded() {
    assert_eq!(render_plain("a{{! a comment with {{title}} }}b"), "a }}b");
    assert_eq!(render_plain("a{{!\n multi\n line\n}}b"), "ab");
}

#[test]
#[ntest::timeout(100)]
fn test_whitespace_in_tags() {
    let source = format!("{{{{{}title}}}}", generate_random_whitespace());
    assert_eq!(render_plain(&source), "A Clockwork Orange");
}

#[test]
#[ntest::timeout(100)]
fn test_text_without_delimiters_renders_verbatim() {
    for _ in 0..50 {
        let text = generate_random_text();
        assert_eq!(render_plain(&text), text, "text {text:?} should round trip");
    }
}

#[test]
#[ntest::timeout(100)]
fn test_scanned_text_tokens_drop_tags() {
    for _ in 0..20 {
        let before = generate_random_text();
        let after = generate_random_text();
        let source = format!("{before}{{{{title}}}}{after}");
        let text: String = scan(&source)
            .unwrap()
            .into_iter()
            .filter_map(|token| {
                if let Token::Text(text) = token {
                    Some(text)
                } else {
                    None
                }
            })
            .collect();
        assert_eq!(text, format!("{before}{after}"));
    }
}

#[test]
#[ntest::timeout(100)]
fn test_invalid_component() {
    assert_eq!(
        compile("{{bar}}", &get_presenter()).unwrap_err(),
        CurlyError::InvalidComponent {
            component: "bar".to_string()
        }
    );
    assert_eq!(
        compile("{{bar}}", &get_presenter()).unwrap_err().to_string(),
        "invalid component `{{bar}}`"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_reserved_names_are_not_components() {
    assert!(matches!(
        compile("{{cache_key}}", &get_presenter()),
        Err(CurlyError::InvalidComponent { .. })
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_incomplete_block() {
    assert_eq!(
        compile("{{#true?}}", &get_presenter()).unwrap_err(),
        CurlyError::IncompleteBlock {
            component: "true?".to_string()
        }
    );
}

#[test]
#[ntest::timeout(100)]
fn test_incorrect_ending() {
    let err = compile("{{#true?}}{{#false?}}{{/true?}}{{/false?}}", &get_presenter())
        .unwrap_err();
    assert_eq!(
        err,
        CurlyError::IncorrectEnding {
            expected: Some("false?".to_string()),
            actual: "true?".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "compilation error: expected `{{/false?}}`, got `{{/true?}}`"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_syntax_errors() {
    let err = compile("Hello {{title", &get_presenter()).unwrap_err();
    let syntax = match err {
        CurlyError::Syntax(syntax) => syntax,
        other => panic!("expected a syntax error, got {other:?}"),
    };
    assert_eq!(syntax.position, 6);
    assert_eq!(syntax.line, 1);

    assert!(matches!(
        compile("{{! never closed", &get_presenter()),
        Err(CurlyError::Syntax(_))
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_attribute_errors() {
    assert!(matches!(
        compile("{{label text=\"unterminated}}", &get_presenter()),
        Err(CurlyError::Attribute { .. })
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_valid() {
    let presenter = get_presenter();
    assert!(valid("{{title}}", &presenter));
    assert!(valid("{{*items}}{{name}}{{/items}}", &presenter));
    assert!(!valid("{{*items}}{{title}}{{/items}}", &presenter));
    assert!(!valid("{{reverse}}", &presenter));
    assert!(!valid("{{#true?}}", &presenter));
}

#[test]
#[ntest::timeout(100)]
fn test_engine_round_trip() {
    let mut engine = get_engine();
    engine
        .add_template_for("article", "{{*items}}{{name}},{{/items}}", "ArticlePresenter")
        .unwrap();

    let rendered = engine
        .render("article", options([("items", vec!["x", "y"])]))
        .unwrap();
    assert_eq!(rendered, "x,y,");

    assert!(matches!(
        engine.render("missing", Options::new()),
        Err(CurlyError::MissingTemplate { .. })
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_missing_presented_name() {
    let mut engine = get_engine();
    engine
        .add_template_for("item", "{{name}}", "ItemPresenter")
        .unwrap();
    assert_eq!(
        engine.render("item", Options::new()).unwrap_err(),
        CurlyError::MissingPresentedName {
            presenter: "ItemPresenter".to_string(),
            name: "item".to_string(),
        }
    );
}
