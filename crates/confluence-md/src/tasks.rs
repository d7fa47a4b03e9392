//! Confluence task list rewriting
//!
//! Storage format represents checklists with `ac:task-list` / `ac:task`
//! elements that generic HTML converters drop or mangle. This pass turns
//! them into plain `<ul>` / `<li>[x] ...</li>` markup before conversion.
//!
//! Matching is scoped to the task elements only. Everything between a
//! task body's tags is copied verbatim apart from the stripped wrappers,
//! so links and other inline markup reach the converter untouched.
//! Task tags are paired by depth, and nested tasks are rewritten before
//! the task that contains them.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static TASK_LIST_EMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<ac:task-list(?:\s[^>]*)?/>").expect("valid regex"));

static TASK_LIST_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<ac:task-list(?:\s[^>]*)?>").expect("valid regex"));

static TASK_LIST_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</ac:task-list\s*>").expect("valid regex"));

/// Opening or closing `ac:task` tag, not its `ac:task-*` children
static TASK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<ac:task(?:\s[^>]*)?>|</ac:task\s*>").expect("valid regex")
});

static TASK_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ac:task-status(?:\s[^>]*)?>(.*?)</ac:task-status\s*>").expect("valid regex")
});

static TASK_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ac:task-body(?:\s[^>]*)?>(.*?)</ac:task-body\s*>").expect("valid regex")
});

static TASK_BODY_EMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<ac:task-body(?:\s[^>]*)?/>").expect("valid regex"));

/// Styling spans and inline comment anchors; only the tags go, content stays
static WRAPPER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?(?:span|ac:inline-comment-marker)(?:\s[^>]*)?/?>").expect("valid regex")
});

/// Checkbox state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Complete,
    Incomplete,
}

impl TaskStatus {
    /// Parse a status token. Only the exact token `complete` is checked;
    /// anything else, including garbage, is treated as open.
    pub fn from_token(token: &str) -> Self {
        if token.trim() == "complete" {
            TaskStatus::Complete
        } else {
            TaskStatus::Incomplete
        }
    }

    /// Markdown checkbox glyph
    pub fn checkbox(self) -> &'static str {
        match self {
            TaskStatus::Complete => "[x]",
            TaskStatus::Incomplete => "[ ]",
        }
    }
}

/// A single `ac:task` element pulled out of the storage markup
#[derive(Debug, Clone, PartialEq, Eq)]
struct Task<'a> {
    status: TaskStatus,
    body: &'a str,
}

impl<'a> Task<'a> {
    /// Split the inner markup of an `ac:task` into status and body.
    /// Returns `None` when either part is missing.
    fn parse(inner: &'a str) -> Option<Self> {
        let status = TASK_STATUS.captures(inner)?.get(1)?.as_str();
        let body = match TASK_BODY.captures(inner) {
            Some(caps) => caps.get(1)?.as_str(),
            None if TASK_BODY_EMPTY.is_match(inner) => "",
            None => return None,
        };

        Some(Self {
            status: TaskStatus::from_token(status),
            body,
        })
    }

    fn to_list_item(&self) -> String {
        let body = WRAPPER_TAG.replace_all(self.body, "");
        format!("<li>{} {}</li>", self.status.checkbox(), body.trim())
    }
}

/// Rewrite Confluence task lists into generic HTML lists with checkbox text.
///
/// Input without task markup is returned unchanged. Tasks that lack a
/// status or body element are left as they are.
pub fn rewrite_task_lists(html: &str) -> String {
    let result = TASK_LIST_EMPTY.replace_all(html, "<ul></ul>");
    let result = replace_cow(result, &TASK_LIST_OPEN, "<ul>");
    let result = replace_cow(result, &TASK_LIST_CLOSE, "</ul>");

    rewrite_tasks(&result).into_owned()
}

/// Replace each outermost `ac:task` element with a list item, rewriting
/// its contents first. Unbalanced tags are copied as they are.
fn rewrite_tasks(html: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut depth = 0usize;
    let mut open: Option<(usize, usize)> = None;

    for tag in TASK_TAG.find_iter(html) {
        if !tag.as_str().starts_with("</") {
            if depth == 0 {
                open = Some((tag.start(), tag.end()));
            }
            depth += 1;
            continue;
        }
        if depth == 0 {
            continue;
        }
        depth -= 1;
        if depth > 0 {
            continue;
        }
        let Some((start, inner_start)) = open.take() else {
            continue;
        };

        out.push_str(&html[copied..start]);
        let inner = rewrite_tasks(&html[inner_start..tag.start()]);
        match Task::parse(&inner) {
            Some(task) => out.push_str(&task.to_list_item()),
            None => {
                out.push_str(&html[start..inner_start]);
                out.push_str(&inner);
                out.push_str(tag.as_str());
            }
        }
        copied = tag.end();
    }

    if copied == 0 {
        return Cow::Borrowed(html);
    }
    out.push_str(&html[copied..]);
    Cow::Owned(out)
}

/// `replace_all` on a value that may already be owned, without copying when nothing matches
fn replace_cow<'a>(input: Cow<'a, str>, re: &Regex, rep: &str) -> Cow<'a, str> {
    match input {
        Cow::Borrowed(s) => re.replace_all(s, rep),
        Cow::Owned(s) => {
            let replaced = match re.replace_all(&s, rep) {
                Cow::Borrowed(_) => None,
                Cow::Owned(replaced) => Some(replaced),
            };
            Cow::Owned(replaced.unwrap_or(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_list(status: &str, body: &str) -> String {
        format!(
            r#"<ac:task-list ac:task-list-id="123">
<ac:task>
<ac:task-id>1</ac:task-id>
<ac:task-uuid>abc-123</ac:task-uuid>
<ac:task-status>{}</ac:task-status>
<ac:task-body>{}</ac:task-body>
</ac:task>
</ac:task-list>"#,
            status, body
        )
    }

    fn assert_no_task_markup(result: &str) {
        for tag in [
            "<ac:task-list",
            "</ac:task-list>",
            "<ac:task>",
            "</ac:task>",
            "<ac:task-status>",
            "<ac:task-uuid>",
            "<ac:task-id>",
            "<ac:task-body",
        ] {
            assert!(!result.contains(tag), "found {} in {}", tag, result);
        }
    }

    #[test]
    fn test_complete_task() {
        let input = task_list(
            "complete",
            r#"<span class="placeholder-inline-tasks">Do the thing</span>"#,
        );
        let result = rewrite_task_lists(&input);
        assert!(result.contains("<li>[x] Do the thing</li>"), "{}", result);
        assert!(!result.contains("[ ]"));
        assert!(result.contains("<ul>"));
        assert!(result.contains("</ul>"));
        assert_no_task_markup(&result);
    }

    #[test]
    fn test_incomplete_task() {
        let input = task_list(
            "incomplete",
            r#"<span class="placeholder-inline-tasks">Do the thing</span>"#,
        );
        let result = rewrite_task_lists(&input);
        assert!(result.contains("<li>[ ] Do the thing</li>"), "{}", result);
        assert!(!result.contains("[x]"));
        assert_no_task_markup(&result);
    }

    #[test]
    fn test_unknown_status_is_unchecked() {
        for status in ["COMPLETE", "done", "", "  ", "complete!"] {
            let result = rewrite_task_lists(&task_list(status, "Water plants"));
            assert!(
                result.contains("<li>[ ] Water plants</li>"),
                "status {:?}: {}",
                status,
                result
            );
        }
    }

    #[test]
    fn test_status_whitespace_ignored() {
        let result = rewrite_task_lists(&task_list("\n  complete\n", "Ship it"));
        assert!(result.contains("<li>[x] Ship it</li>"), "{}", result);
    }

    #[test]
    fn test_mixed_tasks_keep_links() {
        let input = r#"<ac:task-list ac:task-list-id="48f431f0-7f5e-4131-8de0-f0f1b5ceb499">
<ac:task>
<ac:task-id>1</ac:task-id>
<ac:task-uuid>66c1cef3-a623-4249-94f2-77be088c9b9a</ac:task-uuid>
<ac:task-status>complete</ac:task-status>
<ac:task-body><span class="placeholder-inline-tasks">add error rate by route <a href="https://example.com/dash">https://example.com/dash</a> not just latency</span></ac:task-body>
</ac:task>
<ac:task>
<ac:task-id>3</ac:task-id>
<ac:task-uuid>efe285e4-7b5d-4ee8-b342-449b3c788643</ac:task-uuid>
<ac:task-status>incomplete</ac:task-status>
<ac:task-body><span class="placeholder-inline-tasks">Swap "main services view" dashboard to prod by default.</span></ac:task-body>
</ac:task>
</ac:task-list>"#;
        let result = rewrite_task_lists(input);
        assert!(result.contains(
            r#"<li>[x] add error rate by route <a href="https://example.com/dash">https://example.com/dash</a> not just latency</li>"#
        ), "{}", result);
        assert!(result.contains(
            r#"<li>[ ] Swap "main services view" dashboard to prod by default.</li>"#
        ));
        assert_eq!(result.matches("<li>").count(), 2);
        assert_no_task_markup(&result);
    }

    #[test]
    fn test_inline_comment_markers_stripped() {
        let body = r#"<span class="placeholder-inline-tasks">Swap<ac:inline-comment-marker ac:ref="229c7393-af3d-42d7-a5e8-0e72e571e602"> "main services view" dashboard to be prod by defa</ac:inline-comment-marker>ult.</span>"#;
        let result = rewrite_task_lists(&task_list("incomplete", body));
        assert!(
            result.contains(r#"<li>[ ] Swap "main services view" dashboard to be prod by default.</li>"#),
            "{}",
            result
        );
        assert!(!result.contains("<span"));
        assert!(!result.contains("<ac:inline-comment-marker"));
        assert!(!result.contains("</ac:inline-comment-marker>"));
    }

    #[test]
    fn test_nested_wrappers_keep_other_tags() {
        let body = "<span><span style=\"color: red;\"><strong>Urgent</strong></span>: call <em>ops</em></span>";
        let result = rewrite_task_lists(&task_list("complete", body));
        assert!(
            result.contains("<li>[x] <strong>Urgent</strong>: call <em>ops</em></li>"),
            "{}",
            result
        );
    }

    #[test]
    fn test_multiline_body() {
        let body = "\n  <span>first line<br/>\n  second line</span>\n";
        let result = rewrite_task_lists(&task_list("complete", body));
        assert!(
            result.contains("<li>[x] first line<br/>\n  second line</li>"),
            "{}",
            result
        );
    }

    #[test]
    fn test_buy_milk() {
        let input = "<ac:task-list><ac:task><ac:task-status>complete</ac:task-status><ac:task-body><span>Buy milk</span></ac:task-body></ac:task></ac:task-list>";
        assert_eq!(rewrite_task_lists(input), "<ul><li>[x] Buy milk</li></ul>");
    }

    #[test]
    fn test_attribute_order_and_empty_body() {
        let input = r#"<ac:task-list ac:task-list-id="9"><ac:task ac:local-id="t1"><ac:task-body ac:x="y"/><ac:task-status>incomplete</ac:task-status></ac:task></ac:task-list>"#;
        assert_eq!(rewrite_task_lists(input), "<ul><li>[ ] </li></ul>");
    }

    #[test]
    fn test_self_closing_task_list() {
        assert_eq!(
            rewrite_task_lists(r#"<p>a</p><ac:task-list ac:task-list-id="1"/><p>b</p>"#),
            "<p>a</p><ul></ul><p>b</p>"
        );
    }

    #[test]
    fn test_malformed_task_left_unchanged() {
        let missing_status = "<ac:task><ac:task-body>orphan</ac:task-body></ac:task>";
        assert_eq!(rewrite_task_lists(missing_status), missing_status);

        let missing_body = "<ac:task><ac:task-status>complete</ac:task-status></ac:task>";
        assert_eq!(rewrite_task_lists(missing_body), missing_body);

        let input = format!("<ac:task-list>{}</ac:task-list>", missing_status);
        assert_eq!(
            rewrite_task_lists(&input),
            format!("<ul>{}</ul>", missing_status)
        );
    }

    #[test]
    fn test_task_list_nested_in_body() {
        let input = "<ac:task-list><ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>Parent<ac:task-list><ac:task><ac:task-status>complete</ac:task-status><ac:task-body>Child</ac:task-body></ac:task></ac:task-list></ac:task-body></ac:task></ac:task-list>";
        let result = rewrite_task_lists(input);
        assert_eq!(
            result,
            "<ul><li>[ ] Parent<ul><li>[x] Child</li></ul></li></ul>"
        );
        assert!(!result.contains("ac:task"));
    }

    #[test]
    fn test_deeply_nested_and_sibling_tasks() {
        let input = task_list(
            "complete",
            &format!(
                "Top{}",
                task_list("incomplete", &format!("Middle{}", task_list("complete", "Leaf")))
            ),
        );
        let input = format!("{}<p>between</p>{}", input, task_list("incomplete", "Next"));
        let result = rewrite_task_lists(&input);
        assert_no_task_markup(&result);
        assert!(result.contains("<li>[x] Leaf</li>"), "{}", result);
        assert!(result.contains("<li>[ ] Middle"), "{}", result);
        assert!(result.contains("<li>[x] Top"), "{}", result);
        assert!(result.contains("<p>between</p>"));
        assert!(result.contains("<li>[ ] Next</li>"));
        assert_eq!(result.matches("<li>").count(), 4);
    }

    #[test]
    fn test_unbalanced_task_tags_left_unchanged() {
        let unclosed = "<ac:task><ac:task-status>complete</ac:task-status><ac:task-body>x</ac:task-body>";
        assert_eq!(rewrite_task_lists(unclosed), unclosed);

        let stray = "<p>a</p></ac:task><p>b</p>";
        assert_eq!(rewrite_task_lists(stray), stray);
    }

    #[test]
    fn test_no_tasks_unchanged() {
        for input in [
            "<p>This is just regular HTML with no tasks</p>",
            "",
            "<ul><li>[x] already plain</li></ul>",
            "<p>task-list and ac:task mentioned in prose</p>",
            "<span class=\"x\">spans outside tasks stay</span>",
            "<ac:structured-macro ac:name=\"info\"><ac:rich-text-body><p>Note</p></ac:rich-text-body></ac:structured-macro>",
        ] {
            assert_eq!(rewrite_task_lists(input), input);
        }
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!(TaskStatus::from_token("complete"), TaskStatus::Complete);
        assert_eq!(TaskStatus::from_token("incomplete"), TaskStatus::Incomplete);
        assert_eq!(TaskStatus::from_token("Complete"), TaskStatus::Incomplete);
        assert_eq!(TaskStatus::Complete.checkbox(), "[x]");
        assert_eq!(TaskStatus::Incomplete.checkbox(), "[ ]");
    }

    #[test]
    fn test_task_parse() {
        let task = Task::parse(
            "<ac:task-id>1</ac:task-id><ac:task-status>complete</ac:task-status><ac:task-body>hi</ac:task-body>",
        )
        .unwrap();
        assert_eq!(
            task,
            Task {
                status: TaskStatus::Complete,
                body: "hi"
            }
        );
        assert!(Task::parse("<ac:task-id>1</ac:task-id>").is_none());
    }
}
