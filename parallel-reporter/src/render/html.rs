// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a [`Run`] as an HTML document.

use super::RenderConfig;
use itertools::Itertools;
use parallel_report_metadata::{
    Hook, HookKind, HookStatus, Run, Step, StepStatus, Suite, Test, TestError, TestStatus,
};
use quick_xml::{
    Writer,
    escape::partial_escape,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::{io, time::Duration};

static HTML_TAG: &str = "html";
static HEAD_TAG: &str = "head";
static BODY_TAG: &str = "body";
static DIV_TAG: &str = "div";
static SPAN_TAG: &str = "span";
static BUTTON_TAG: &str = "button";
static UL_TAG: &str = "ul";
static LI_TAG: &str = "li";
static PRE_TAG: &str = "pre";
static CODE_TAG: &str = "code";
static SCRIPT_TAG: &str = "script";

static STYLESHEET_URL: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";
static ICONS_URL: &str = "https://fonts.googleapis.com/css2?family=Material+Symbols+Rounded";
static SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js";

static ICON_CLASS: &str = "material-symbols-rounded";
static GENERATED_AT_FORMAT: &str = "%d %b %Y, %I:%M:%S %p UTC";

pub(super) fn serialize_run(
    run: &Run,
    config: &RenderConfig,
    writer: impl io::Write,
) -> quick_xml::Result<()> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;

    start_tag(HTML_TAG, &[("lang", "en"), ("data-bs-theme", "light")], &mut writer)?;
    serialize_head(config, &mut writer)?;
    serialize_body(run, config, &mut writer)?;
    end_tag(HTML_TAG, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()
}

fn serialize_head(
    config: &RenderConfig,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    start_tag(HEAD_TAG, &[], writer)?;
    empty_tag("meta", &[("charset", "utf-8")], writer)?;
    empty_tag(
        "meta",
        &[
            ("name", "viewport"),
            ("content", "width=device-width, initial-scale=1"),
        ],
        writer,
    )?;
    text_element("title", &[], &config.report_title, writer)?;
    empty_tag("link", &[("rel", "stylesheet"), ("href", STYLESHEET_URL)], writer)?;
    empty_tag("link", &[("rel", "stylesheet"), ("href", ICONS_URL)], writer)?;
    end_tag(HEAD_TAG, writer)
}

fn serialize_body(
    run: &Run,
    config: &RenderConfig,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Run {
        suites,
        failures,
        stats,
        start_time: _,
        end_time,
        duration,
    } = run;

    start_tag(BODY_TAG, &[], writer)?;

    start_tag(DIV_TAG, &[("class", "container"), ("id", "summary")], writer)?;
    text_element("h1", &[("class", "text-center m-2")], &config.report_title, writer)?;
    text_element(
        "h5",
        &[("class", "text-center text-secondary")],
        &config.project_name,
        writer,
    )?;
    let generated_at = format!("Generated {}", end_time.format(GENERATED_AT_FORMAT));
    text_element("p", &[("class", "text-end text-body-tertiary")], &generated_at, writer)?;

    start_tag(DIV_TAG, &[("class", "row text-center border rounded p-2")], writer)?;
    for (label, value) in [
        ("Duration", format_duration(*duration)),
        ("Suites", suites.len().to_string()),
        ("Tests", stats.total.to_string()),
        ("Passed", stats.passed.to_string()),
        ("Failed", stats.failed.to_string()),
        ("Skipped", stats.skipped.to_string()),
    ] {
        let mut class = format!("col summary-{}", label.to_ascii_lowercase());
        if label == "Failed" && stats.has_failures() {
            class.push_str(" text-danger");
        }
        start_tag(DIV_TAG, &[("class", &class)], writer)?;
        text_element(SPAN_TAG, &[("class", "fw-bold me-1")], &format!("{label}:"), writer)?;
        text_element(SPAN_TAG, &[], &value, writer)?;
        end_tag(DIV_TAG, writer)?;
    }
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;

    let mut ids = SectionIds::default();

    start_tag(DIV_TAG, &[("class", "container mt-4"), ("id", "suites")], writer)?;
    for (index, suite) in suites.iter().enumerate() {
        serialize_suite(suite, index, &mut ids, writer)?;
    }
    end_tag(DIV_TAG, writer)?;

    if !failures.is_empty() {
        serialize_failures(failures, &mut ids, writer)?;
    }

    start_tag(SCRIPT_TAG, &[("src", SCRIPT_URL)], writer)?;
    end_tag(SCRIPT_TAG, writer)?;
    end_tag(BODY_TAG, writer)
}

fn serialize_suite(
    suite: &Suite,
    index: usize,
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let Suite {
        title,
        file,
        tags: _,
        tests,
        hooks: _,
        failures: _,
        start_time: _,
        end_time: _,
        duration,
        stats,
    } = suite;

    let suite_id = format!("suite-{index}");
    let accordion_id = format!("accordion-{index}");

    start_tag(DIV_TAG, &[("class", "suite mb-3")], writer)?;
    start_tag(DIV_TAG, &[("class", "d-grid gap-2")], writer)?;
    start_tag(
        BUTTON_TAG,
        &[
            ("class", "btn btn-primary rounded-0"),
            ("type", "button"),
            ("data-bs-toggle", "collapse"),
            ("data-bs-target", &format!("#{suite_id}")),
            ("aria-expanded", "true"),
            ("aria-controls", &suite_id),
        ],
        writer,
    )?;
    start_tag(DIV_TAG, &[("class", "hstack gap-3")], writer)?;
    text_element(DIV_TAG, &[("class", "p-2 suite-title")], title, writer)?;
    text_element(DIV_TAG, &[("class", "p-2 suite-file")], file, writer)?;
    let counts = format!(
        "{} passed, {} failed, {} skipped",
        stats.passed, stats.failed, stats.skipped
    );
    text_element(DIV_TAG, &[("class", "p-2 ms-auto")], &counts, writer)?;
    text_element(DIV_TAG, &[("class", "p-2")], &format_duration(*duration), writer)?;
    end_tag(DIV_TAG, writer)?;
    end_tag(BUTTON_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;

    start_tag(DIV_TAG, &[("class", "collapse show"), ("id", &suite_id)], writer)?;
    start_tag(DIV_TAG, &[("class", "accordion"), ("id", &accordion_id)], writer)?;

    serialize_suite_hooks(
        suite,
        HookKind::BeforeSuite,
        "Before Suite Hooks",
        &accordion_id,
        ids,
        writer,
    )?;
    for test in tests {
        serialize_test(test, &accordion_id, ids, writer)?;
    }
    serialize_suite_hooks(
        suite,
        HookKind::AfterSuite,
        "After Suite Hooks",
        &accordion_id,
        ids,
        writer,
    )?;

    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)
}

fn serialize_suite_hooks(
    suite: &Suite,
    kind: HookKind,
    label: &str,
    accordion_id: &str,
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let hooks: Vec<_> = suite.hooks_of_kind(kind).collect();
    if hooks.is_empty() {
        return Ok(());
    }

    let section_id = ids.next("section");
    let duration = hooks.iter().map(|hook| hook.duration).sum();
    let status = if hooks.iter().any(|hook| hook.status == HookStatus::Failed) {
        HookStatus::Failed
    } else {
        HookStatus::Passed
    };

    start_tag(DIV_TAG, &[("class", "accordion-item suite-hooks")], writer)?;
    serialize_section_header(&section_id, hook_icon(status), label, duration, writer)?;
    start_section_body(&section_id, accordion_id, writer)?;
    for (index, hook) in hooks.into_iter().enumerate() {
        serialize_hook(hook, &format!("Hook #{}", index + 1), ids, writer)?;
    }
    end_section_body(writer)?;
    end_tag(DIV_TAG, writer)
}

fn serialize_test(
    test: &Test,
    accordion_id: &str,
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let Test {
        title,
        status,
        start_time: _,
        end_time: _,
        duration,
        file: _,
        tags,
        steps,
        hooks: _,
        error,
        warnings,
        skip_reason,
    } = test;

    let section_id = ids.next("section");
    let class = format!("accordion-item test test-{status}");

    start_tag(DIV_TAG, &[("class", &class)], writer)?;
    serialize_section_header(&section_id, test_icon(*status), title, *duration, writer)?;
    start_section_body(&section_id, accordion_id, writer)?;

    if !tags.is_empty() {
        start_tag(DIV_TAG, &[("class", "d-flex align-items-center mb-2 tags")], writer)?;
        text_element("h6", &[("class", "p-2 m-0")], "Tags:", writer)?;
        for tag in tags.iter().unique() {
            text_element(SPAN_TAG, &[("class", "badge text-bg-secondary me-1 tag")], tag, writer)?;
        }
        end_tag(DIV_TAG, writer)?;
    }

    for hook in test.hooks_of_kind(HookKind::Before) {
        serialize_hook(hook, "Before Test Hook", ids, writer)?;
    }

    if status.is_skipped() {
        start_tag(UL_TAG, &[("class", "list-group mb-4 skip-info")], writer)?;
        text_element(LI_TAG, &[("class", "list-group-item fw-bold")], "Skip Info", writer)?;
        let reason = skip_reason.as_deref().unwrap_or_default();
        text_element(LI_TAG, &[("class", "list-group-item")], reason, writer)?;
        end_tag(UL_TAG, writer)?;
    } else if !steps.is_empty() {
        start_tag(UL_TAG, &[("class", "list-group mb-4 steps")], writer)?;
        text_element(LI_TAG, &[("class", "list-group-item fw-bold")], "Steps", writer)?;
        for step in steps {
            serialize_step(step, writer)?;
        }
        end_tag(UL_TAG, writer)?;
    }

    for hook in test.hooks_of_kind(HookKind::After) {
        serialize_hook(hook, "After Test Hook", ids, writer)?;
    }
    for hook in test.hooks_of_kind(HookKind::Unknown) {
        serialize_hook(hook, "Hook", ids, writer)?;
    }

    if !warnings.is_empty() {
        start_tag(UL_TAG, &[("class", "list-group mb-4 warnings")], writer)?;
        text_element(LI_TAG, &[("class", "list-group-item fw-bold")], "Warnings", writer)?;
        for warning in warnings {
            text_element(
                LI_TAG,
                &[("class", "list-group-item text-warning-emphasis")],
                warning,
                writer,
            )?;
        }
        end_tag(UL_TAG, writer)?;
    }

    if let Some(error) = error {
        serialize_error(error, ids, writer)?;
    }

    end_section_body(writer)?;
    end_tag(DIV_TAG, writer)
}

fn serialize_hook(
    hook: &Hook,
    label: &str,
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let Hook {
        title,
        kind: _,
        status,
        start_time: _,
        end_time: _,
        duration,
        error,
        location: _,
        steps,
    } = hook;

    start_tag(DIV_TAG, &[("class", "pb-4 hook")], writer)?;
    start_tag(UL_TAG, &[("class", "list-group")], writer)?;
    start_tag(LI_TAG, &[("class", "list-group-item")], writer)?;
    start_tag(DIV_TAG, &[("class", "hstack gap-2")], writer)?;
    serialize_icon(hook_icon(*status), writer)?;
    text_element(DIV_TAG, &[("class", "fw-bold")], label, writer)?;
    text_element(DIV_TAG, &[("class", "text-secondary hook-title")], title, writer)?;
    text_element(
        DIV_TAG,
        &[("class", "ms-auto text-secondary")],
        &format_duration(*duration),
        writer,
    )?;
    end_tag(DIV_TAG, writer)?;
    end_tag(LI_TAG, writer)?;
    for step in steps {
        serialize_step(step, writer)?;
    }
    end_tag(UL_TAG, writer)?;

    if let Some(error) = error {
        serialize_error(error, ids, writer)?;
    }
    end_tag(DIV_TAG, writer)
}

fn serialize_step(step: &Step, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let class = format!("list-group-item step step-{}", step.status);
    start_tag(LI_TAG, &[("class", &class)], writer)?;
    start_tag(DIV_TAG, &[("class", "hstack gap-2")], writer)?;
    serialize_icon(step_icon(step.status), writer)?;
    text_element(CODE_TAG, &[], &format_step_line(step), writer)?;
    text_element(
        DIV_TAG,
        &[("class", "ms-auto text-secondary")],
        &format_duration(step.duration),
        writer,
    )?;
    end_tag(DIV_TAG, writer)?;
    end_tag(LI_TAG, writer)
}

fn serialize_error(
    error: &TestError,
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestError {
        stack,
        message,
        actual,
        expected,
        file: _,
        test_name: _,
    } = error;

    let error_pane = ids.next("error-pane");
    let stack_pane = ids.next("stack-pane");

    start_tag(DIV_TAG, &[("class", "mt-3 error-detail")], writer)?;
    start_tag(UL_TAG, &[("class", "nav nav-tabs"), ("role", "tablist")], writer)?;
    let panes = [
        (&error_pane, "Error", true),
        (&stack_pane, "Stack Trace", false),
    ];
    for (pane, label, active) in panes {
        start_tag(LI_TAG, &[("class", "nav-item"), ("role", "presentation")], writer)?;
        text_element(
            BUTTON_TAG,
            &[
                ("class", if active { "nav-link active" } else { "nav-link" }),
                ("data-bs-toggle", "tab"),
                ("data-bs-target", &format!("#{pane}")),
                ("type", "button"),
                ("role", "tab"),
                ("aria-controls", pane),
                ("aria-selected", if active { "true" } else { "false" }),
            ],
            label,
            writer,
        )?;
        end_tag(LI_TAG, writer)?;
    }
    end_tag(UL_TAG, writer)?;

    start_tag(DIV_TAG, &[("class", "tab-content p-2 border border-top-0 rounded-bottom")], writer)?;

    start_tag(
        DIV_TAG,
        &[("class", "tab-pane fade show active"), ("id", &error_pane), ("role", "tabpanel")],
        writer,
    )?;
    start_tag(DIV_TAG, &[("class", "alert alert-danger"), ("role", "alert")], writer)?;
    for (class, heading, body) in [
        ("error-message", "Error:", message),
        ("error-actual", "Actual:", actual),
        ("error-expected", "Expected:", expected),
    ] {
        text_element("h6", &[], heading, writer)?;
        text_element(PRE_TAG, &[("class", class)], body, writer)?;
    }
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;

    start_tag(
        DIV_TAG,
        &[("class", "tab-pane fade"), ("id", &stack_pane), ("role", "tabpanel")],
        writer,
    )?;
    start_tag(DIV_TAG, &[("class", "alert alert-danger"), ("role", "alert")], writer)?;
    text_element(PRE_TAG, &[("class", "error-stack")], stack, writer)?;
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;

    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)
}

fn serialize_failures(
    failures: &[TestError],
    ids: &mut SectionIds,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    static ACCORDION_ID: &str = "accordion-failures";

    start_tag(DIV_TAG, &[("class", "container mt-4 mb-4"), ("id", "failures")], writer)?;
    start_tag(DIV_TAG, &[("class", "d-grid gap-2")], writer)?;
    start_tag(
        BUTTON_TAG,
        &[
            ("class", "btn btn-danger rounded-0"),
            ("type", "button"),
            ("data-bs-toggle", "collapse"),
            ("data-bs-target", "#failures-list"),
            ("aria-expanded", "true"),
            ("aria-controls", "failures-list"),
        ],
        writer,
    )?;
    text_element(SPAN_TAG, &[], &format!("Failures ({})", failures.len()), writer)?;
    end_tag(BUTTON_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;

    start_tag(DIV_TAG, &[("class", "collapse show"), ("id", "failures-list")], writer)?;
    start_tag(DIV_TAG, &[("class", "accordion"), ("id", ACCORDION_ID)], writer)?;
    for failure in failures {
        let section_id = ids.next("section");
        start_tag(DIV_TAG, &[("class", "accordion-item failure")], writer)?;

        start_tag("h2", &[("class", "accordion-header")], writer)?;
        start_section_button(&section_id, writer)?;
        start_tag(UL_TAG, &[("class", "list-group list-group-horizontal flex-fill me-2")], writer)?;
        for (class, text) in [
            ("failure-file", &failure.file),
            ("failure-test", &failure.test_name),
            ("failure-message", &failure.message),
        ] {
            let class = format!("list-group-item text-truncate {class}");
            text_element(LI_TAG, &[("class", &class)], text, writer)?;
        }
        end_tag(UL_TAG, writer)?;
        end_tag(BUTTON_TAG, writer)?;
        end_tag("h2", writer)?;

        start_section_body(&section_id, ACCORDION_ID, writer)?;
        serialize_error(failure, ids, writer)?;
        end_section_body(writer)?;

        end_tag(DIV_TAG, writer)?;
    }
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)
}

// ---
// Accordion sections
// ---

fn serialize_section_header(
    section_id: &str,
    icon: Icon,
    title: &str,
    duration: Duration,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    start_tag("h2", &[("class", "accordion-header")], writer)?;
    start_section_button(section_id, writer)?;
    serialize_icon(icon, writer)?;
    text_element(SPAN_TAG, &[("class", "text-wrap p-2 section-title")], title, writer)?;
    text_element(
        SPAN_TAG,
        &[("class", "text-secondary ms-auto p-2")],
        &format_duration(duration),
        writer,
    )?;
    end_tag(BUTTON_TAG, writer)?;
    end_tag("h2", writer)
}

fn start_section_button(
    section_id: &str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    start_tag(
        BUTTON_TAG,
        &[
            ("class", "accordion-button collapsed"),
            ("type", "button"),
            ("data-bs-toggle", "collapse"),
            ("data-bs-target", &format!("#{section_id}")),
            ("aria-expanded", "false"),
            ("aria-controls", section_id),
        ],
        writer,
    )
}

fn start_section_body(
    section_id: &str,
    accordion_id: &str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    start_tag(
        DIV_TAG,
        &[
            ("id", section_id),
            ("class", "accordion-collapse collapse"),
            ("data-bs-parent", &format!("#{accordion_id}")),
        ],
        writer,
    )?;
    start_tag(DIV_TAG, &[("class", "accordion-body")], writer)
}

fn end_section_body(writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    end_tag(DIV_TAG, writer)?;
    end_tag(DIV_TAG, writer)
}

#[derive(Copy, Clone, Debug)]
struct Icon {
    name: &'static str,
    class: &'static str,
}

fn test_icon(status: TestStatus) -> Icon {
    let (name, class) = match status {
        TestStatus::Passed => ("check", "text-success"),
        TestStatus::Failed => ("close", "text-danger"),
        TestStatus::Pending | TestStatus::Skipped => ("warning", "text-warning"),
        TestStatus::JustStarted => ("question_mark", "text-secondary"),
    };
    Icon { name, class }
}

fn hook_icon(status: HookStatus) -> Icon {
    let class = match status {
        HookStatus::Passed => "text-success",
        HookStatus::Failed => "text-danger",
        HookStatus::Started => "text-secondary",
    };
    Icon {
        name: "phishing",
        class,
    }
}

fn step_icon(status: StepStatus) -> Icon {
    let (name, class) = match status {
        StepStatus::Passed => ("check_small", "text-success"),
        StepStatus::Failed => ("close_small", "text-danger"),
        StepStatus::Skipped | StepStatus::Pending | StepStatus::Unknown => {
            ("exclamation", "text-warning")
        }
    };
    Icon { name, class }
}

fn serialize_icon(icon: Icon, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let class = format!("{ICON_CLASS} {}", icon.class);
    text_element(SPAN_TAG, &[("class", &class)], icon.name, writer)
}

/// Hands out document-unique element IDs.
#[derive(Debug, Default)]
struct SectionIds {
    next: usize,
}

impl SectionIds {
    fn next(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next);
        self.next += 1;
        id
    }
}

pub(super) fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

pub(super) fn format_step_line(step: &Step) -> String {
    if step.actor.is_empty() {
        format!("{} ({})", step.name, step.args)
    } else {
        format!("{}.{} ({})", step.actor, step.name, step.args)
    }
}

// ---
// Element helpers
// ---

fn start_tag(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(tag_name);
    tag.extend_attributes(attributes.iter().copied());
    writer.write_event(Event::Start(tag))
}

fn empty_tag(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(tag_name);
    tag.extend_attributes(attributes.iter().copied());
    writer.write_event(Event::Empty(tag))
}

fn text_element(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    start_tag(tag_name, attributes, writer)?;
    if !text.is_empty() {
        // Quotes are not escaped in text content.
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    }
    end_tag(tag_name, writer)
}

fn end_tag(tag_name: &'static str, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))
}
