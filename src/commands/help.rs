use super::Command;
use super::usage::Usage;
use itertools::Itertools;

fn table(rows: &[[String; 3]]) -> String {
    let w0 = rows.iter().map(|r| r[0].len()).max().unwrap_or(0);
    let w1 = rows.iter().map(|r| r[1].len()).max().unwrap_or(0);
    rows.iter()
        .map(|[a, b, c]| {
            format!("  {a:<w0$}  {b:<w1$}  {c}")
                .trim_end()
                .to_string()
        })
        .join("\n")
}

fn options(version: bool) -> String {
    let mut rows = vec![[
        "--help".to_string(),
        "Show help".to_string(),
        "[boolean]".to_string(),
    ]];
    if version {
        rows.push([
            "--version".to_string(),
            "Show version number".to_string(),
            "[boolean]".to_string(),
        ]);
    }
    format!("Options:\n{}", table(&rows))
}

pub(crate) fn render_command(script: &str, usage: &Usage, description: &str, version: bool) -> String {
    let mut sections = vec![format!("{script} {}", usage.as_str())];
    if !description.is_empty() {
        sections.push(description.to_string());
    }
    if !usage.args.is_empty() {
        let rows: Vec<[String; 3]> = usage
            .args
            .iter()
            .map(|arg| {
                let tags = [
                    arg.variadic.then_some("[array]"),
                    arg.required.then_some("[required]"),
                ];
                [
                    arg.name.clone(),
                    String::new(),
                    tags.iter().flatten().join(" "),
                ]
            })
            .collect();
        sections.push(format!("Positionals:\n{}", table(&rows)));
    }
    sections.push(options(version));
    sections.join("\n\n")
}

pub(crate) fn render_root(script: &str, commands: &[Command], version: bool) -> String {
    let mut sections = Vec::new();
    if commands.is_empty() {
        sections.push(script.to_string());
    } else {
        sections.push(format!("{script} <command>"));
        let rows: Vec<[String; 3]> = commands
            .iter()
            .map(|cmd| {
                [
                    format!("{script} {}", cmd.usage.as_str()),
                    cmd.description.clone(),
                    String::new(),
                ]
            })
            .collect();
        sections.push(format!("Commands:\n{}", table(&rows)));
    }
    sections.push(options(version));
    sections.join("\n\n")
}
