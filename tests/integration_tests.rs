//! Integration tests for formatting and rewriting through the public API

use pretty_assertions::assert_eq;

use gtfmt::{fix, format, formatted, Error};

#[test]
fn test_fix_function() {
    let tpl = r#"{{index "index" "d"}}"#;
    let out = fix("tpl", tpl, "index", "strings.Index").expect("should fix");
    assert_eq!(out, r#"{{strings.Index "index" "d"}}"#);
}

#[test]
fn test_fix_path() {
    let tpl = r#"{{.Foo.Bar ".Foo.Bar"}}"#;
    let out = fix("tpl", tpl, ".Foo.Bar", ".Foo.Baz").expect("should fix");
    assert_eq!(out, r#"{{.Foo.Baz ".Foo.Bar"}}"#);
}

#[test]
fn test_format() {
    let tpl = r#"{{  index   "index"   "d"  }}"#;
    let out = format("tpl", tpl).expect("should format");
    assert_eq!(out, r#"{{index "index" "d"}}"#);
}

#[test]
fn test_fix_function_preserves_surrounding_text() {
    let tpl = r#"Hi!  {{  Foo  .Index.Foo  "Foo"  }}33"#;
    let out = fix("tpl", tpl, "Foo", "Bar").expect("should fix");
    assert_eq!(out, r#"Hi!  {{Bar .Index.Foo "Foo"}}33"#);
}

#[test]
fn test_fix_path_prefix_of_longer_path() {
    let tpl = "{{.Index.Foo.Bar}}";
    let out = fix("tpl", tpl, ".Foo", ".Foo.Baz").expect("should fix");
    assert_eq!(out, "{{.Index.Foo.Baz.Bar}}");
}

#[test]
fn test_sub_templates_rejected() {
    let tpl = "
{{define \"foo\" }}
{{ bar 1 }}
{{end}}
{{ template \"foo\" . }}
";
    for result in [
        format("tpl", tpl).map(|_| ()),
        formatted("tpl", tpl).map(|_| ()),
        fix("tpl", tpl, "bar", "baz").map(|_| ()),
    ] {
        let err = result.expect_err("sub template should trigger error");
        assert_eq!(err.to_string(), "sub templates not currently supported");
    }
}

#[test]
fn test_round_trip_on_canonical_source() {
    let sources = [
        "plain text only\n",
        r#"{{index "index" "d"}}"#,
        "a {{.Foo.Bar}} b",
        "{{if .Ok}}yes{{else}}no{{end}}",
        "{{if .A}}a{{else if .B}}b{{else}}c{{end}}",
        "{{range $i, $v := .Items}}{{$v}}{{end}}",
        "{{with .User}}{{.Name}}{{end}}",
        "{{.Items | len | printf \"%d\"}}",
        "{{not (eq .A .B)}}",
        r#"{{template "header" .}}"#,
    ];
    for source in sources {
        assert_eq!(
            format("tpl", source).expect("should format"),
            source,
            "canonical source should render unchanged"
        );
        assert!(formatted("tpl", source).expect("should check"));
    }
}

#[test]
fn test_formatted_check_agrees_with_render() {
    let sources = [
        "{{.Foo}}",
        "{{ .Foo }}",
        "{{  if  .Ok  }}x{{  end  }}",
        "text only",
    ];
    for source in sources {
        let rendered = format("tpl", source).expect("should format");
        let is_formatted = formatted("tpl", source).expect("should check");
        assert_eq!(is_formatted, rendered == source, "source: {:?}", source);
    }
}

#[test]
fn test_noop_rewrite_returns_input() {
    let tpl = "{{if .Ok}}{{len .Items}}{{end}}";
    assert_eq!(fix("tpl", tpl, "absent", "other").expect("should fix"), tpl);
    assert_eq!(
        fix("tpl", tpl, ".Absent.Path", ".Other").expect("should fix"),
        tpl
    );
}

#[test]
fn test_fix_inside_nested_scopes() {
    let tpl = "{{range .Items}}{{if .Ok}}{{old .X}}{{end}}{{end}}";
    let out = fix("tpl", tpl, "old", "new").expect("should fix");
    assert_eq!(out, "{{range .Items}}{{if .Ok}}{{new .X}}{{end}}{{end}}");
}

#[test]
fn test_fix_unknown_function_target() {
    // Rewriting must work even when the template references functions no
    // builtin table declares.
    let tpl = "{{frobnicate .X}}";
    let out = fix("tpl", tpl, "frobnicate", "transmogrify").expect("should fix");
    assert_eq!(out, "{{transmogrify .X}}");
}

#[test]
fn test_syntax_error_reported() {
    let err = format("tpl", "{{if .Ok}}no end").expect_err("should fail");
    assert!(matches!(err, Error::Parse(_)));
}
