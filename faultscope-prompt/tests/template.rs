use std::collections::HashMap;

use faultscope_prompt::PromptTemplate;

#[test]
fn renders_template_with_vars() {
    let tmpl = PromptTemplate::new("Machine {{ id }} reports {{symptom}}").expect("template");
    let mut vars = HashMap::new();
    vars.insert("id", "M-1".to_string());
    vars.insert("symptom", "overheating".to_string());
    assert_eq!(tmpl.render(&vars), "Machine M-1 reports overheating");
}

#[test]
fn does_not_confuse_overlapping_keys() {
    let tmpl = PromptTemplate::new("{{name}} {{fullname}}").expect("template");
    let mut vars = HashMap::new();
    vars.insert("name", "X".to_string());
    vars.insert("fullname", "Y".to_string());
    assert_eq!(tmpl.render(&vars), "X Y");
}

#[test]
fn unknown_placeholders_render_empty() {
    let tmpl = PromptTemplate::new("a{{missing}}b").expect("template");
    assert_eq!(tmpl.render(&HashMap::new()), "ab");
}

#[test]
fn lists_variables_once_in_order() {
    let tmpl = PromptTemplate::new("{{b}} {{a}} {{b}}").expect("template");
    assert_eq!(tmpl.variables(), ["b", "a"]);
}
