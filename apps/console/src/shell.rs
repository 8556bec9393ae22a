//! Line-oriented operator session.
//!
//! Each input line is split with shell quoting rules and parsed by clap, then
//! mapped onto a state edit or an orchestrator action. Errors are reported and
//! the session state stays as it was.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{builder::BoolishValueParser, Parser, Subcommand};
use console_core::{
    default_labels,
    export::{render as render_export, ExportKind},
    state::{ConfigField, SessionSettings, SourceMode, Stage},
    views::{filter_testcases, search_scenarios, TypeFilter},
    Outcome, SessionOrchestrator, WorkflowState,
};
use shared::{domain::Scenario, protocol::LABEL_CHOICES};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::render;

const PROMPT: &str = "testgen> ";

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    disable_version_flag = true,
    override_usage = "<command> [args]"
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Show progress, counts and session settings
    Status,
    /// Select a stage by number or name; without an argument list the stages
    Stage { stage: Option<String> },
    /// Set the project name sent to the service as tenant id
    Project { name: String },
    /// Set the service base URL
    Api { url: String },
    /// Turn developer mode on or off (toggles without an argument)
    Developer {
        #[arg(value_parser = BoolishValueParser::new())]
        on: Option<bool>,
    },
    /// Documentation sources
    #[command(subcommand)]
    Source(SourceCommand),
    /// Build the knowledge base from the current sources
    Index,
    /// Set or clear the Jira issue key
    Issue { key: Option<String> },
    /// Jira requirements preview
    #[command(subcommand)]
    Requirements(RequirementsCommand),
    /// Edit a project setting, e.g. `set jira.project_key WMS`
    Set {
        field: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Show project settings and quality issues
    Settings,
    #[command(subcommand)]
    Scenarios(ScenariosCommand),
    #[command(subcommand)]
    Testcases(TestcasesCommand),
    /// Send scenarios and test cases to Jira
    Push {
        /// Label prefix; repeat for several (default QA, AutoGen)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Write sources, settings, scenarios, jira, csv or all to disk
    Export {
        kind: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    #[command(subcommand)]
    Draft(DraftCommand),
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug)]
enum SourceCommand {
    /// Add a PDF or web page URL
    Add {
        url: String,
        /// auto, pdf or web
        #[arg(long = "type", default_value = "auto")]
        kind: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    List,
    Clear,
    /// Add two placeholder sources
    Samples,
}

#[derive(Subcommand, Debug)]
enum RequirementsCommand {
    /// Preview requirements of the linked Jira issue
    Fetch,
    /// Copy the fetched preview into project settings
    Use,
    /// Forget the fetched preview
    Clear,
    /// Show the fetched preview and the requirements in use
    List,
}

#[derive(Subcommand, Debug)]
enum ScenariosCommand {
    Generate {
        /// 5 to 60
        #[arg(long)]
        max: Option<u32>,
    },
    List { keyword: Option<String> },
    Show { id: String },
}

#[derive(Subcommand, Debug)]
enum TestcasesCommand {
    Generate,
    List {
        scenario: String,
        /// All or one of Functional, Negative, Edge, Security, Performance, Recovery
        #[arg(long = "type", default_value = "All")]
        kind: String,
        #[arg(long)]
        keyword: Option<String>,
    },
    Show { scenario: String, tc_id: String },
}

#[derive(Subcommand, Debug)]
enum DraftCommand {
    /// Save under a name, or a timestamped default
    Save { name: Option<String> },
    Load { name: String },
    List,
    /// Start over, keeping project name and service address
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    orchestrator: SessionOrchestrator,
    state: WorkflowState,
    max_scenarios: u32,
    export_dir: PathBuf,
}

impl Shell {
    pub fn new(
        orchestrator: SessionOrchestrator,
        state: WorkflowState,
        max_scenarios: u32,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            orchestrator,
            state,
            max_scenarios,
            export_dir,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub async fn run(&mut self) -> Result<()> {
        info!(project = %self.state.settings.project_name, "console session started");
        print!("{}", render::status(&self.state));
        println!("Type `help` for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write_prompt(&mut std::io::stdout())?;

            let Some(line) = lines.next_line().await.context("reading input")? else {
                debug!("input closed");
                break;
            };
            let (flow, output) = self.execute(&line).await;
            print!("{output}");
            if flow == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Runs one input line and returns the text to show.
    pub async fn execute(&mut self, line: &str) -> (Flow, String) {
        let line = line.trim();
        if line.is_empty() {
            return (Flow::Continue, String::new());
        }

        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(err) => return (Flow::Continue, format!("error: {err}\n")),
        };
        let command = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(err) => return (Flow::Continue, err.render().to_string()),
        };
        if matches!(command, ShellCommand::Quit) {
            return (Flow::Quit, String::new());
        }

        match self.dispatch(command).await {
            Ok(output) => (Flow::Continue, output),
            Err(err) => {
                warn!(error = %err, "command failed");
                (Flow::Continue, format!("error: {err:#}\n"))
            }
        }
    }

    async fn dispatch(&mut self, command: ShellCommand) -> Result<String> {
        match command {
            ShellCommand::Status => Ok(render::status(&self.state)),
            ShellCommand::Stage { stage: None } => Ok(render::stage_list(self.state.stage)),
            ShellCommand::Stage { stage: Some(raw) } => {
                let stage: Stage = raw.parse()?;
                self.replace_state(|state| state.select_stage(stage));
                Ok(render::stage(&self.state, stage))
            }
            ShellCommand::Project { name } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(anyhow!("project name cannot be empty"));
                }
                let settings = SessionSettings {
                    project_name: name.clone(),
                    ..self.state.settings.clone()
                };
                self.replace_state(|state| state.with_settings(settings));
                Ok(format!("Project set to {name}\n"))
            }
            ShellCommand::Api { url } => {
                console_core::state::validate_http_url(&url)?;
                let api_base = url.trim().trim_end_matches('/').to_string();
                let settings = SessionSettings {
                    api_base: api_base.clone(),
                    ..self.state.settings.clone()
                };
                self.replace_state(|state| state.with_settings(settings));
                Ok(format!("Service set to {api_base}\n"))
            }
            ShellCommand::Developer { on } => {
                let developer_mode = on.unwrap_or(!self.state.settings.developer_mode);
                let settings = SessionSettings {
                    developer_mode,
                    ..self.state.settings.clone()
                };
                self.replace_state(|state| state.with_settings(settings));
                Ok(format!(
                    "Developer mode {}\n",
                    if developer_mode { "on" } else { "off" }
                ))
            }
            ShellCommand::Source(command) => self.source(command),
            ShellCommand::Index => {
                let outcome = self.orchestrator.build_knowledge_base(&self.state).await?;
                let mut output = self.accept(outcome);
                if self.state.settings.developer_mode {
                    output.push_str(&render::raw(&self.state.last_index_result));
                }
                Ok(output)
            }
            ShellCommand::Issue { key } => {
                let key = key.unwrap_or_default();
                self.replace_state(|state| state.with_issue_key(&key));
                Ok(match self.state.issue_key() {
                    Some(key) => format!("Linked Jira issue {key}\n"),
                    None => "Jira issue key cleared\n".into(),
                })
            }
            ShellCommand::Requirements(command) => self.requirements(command).await,
            ShellCommand::Set { field, value } => {
                let field: ConfigField = field.parse()?;
                let value = value.join(" ").replace("\\n", "\n");
                self.replace_state(|state| state.set_config_field(field, &value));
                Ok(format!("Updated {}\n", field.key()))
            }
            ShellCommand::Settings => Ok(render::project_settings(&self.state.project_config)),
            ShellCommand::Scenarios(command) => self.scenarios(command).await,
            ShellCommand::Testcases(command) => self.testcases(command).await,
            ShellCommand::Push { labels } => {
                let labels = if labels.is_empty() { default_labels() } else { labels };
                for label in &labels {
                    if !LABEL_CHOICES.contains(&label.as_str()) {
                        warn!(label = %label, "label is not one of the usual choices");
                    }
                }
                let outcome = self.orchestrator.push_to_jira(&self.state, &labels).await?;
                let mut output = self.accept(outcome);
                output.push_str(&render::push_summary(&self.state));
                if self.state.settings.developer_mode {
                    if let Some(result) = &self.state.last_push_result {
                        output.push_str(&render::raw(result));
                    }
                }
                Ok(output)
            }
            ShellCommand::Export { kind, out } => self.export(&kind, out).await,
            ShellCommand::Draft(command) => self.draft(command).await,
            ShellCommand::Quit => Ok(String::new()),
        }
    }

    fn source(&mut self, command: SourceCommand) -> Result<String> {
        match command {
            SourceCommand::Add { url, kind, tags } => {
                let mode: SourceMode = kind.parse()?;
                let (next, hint) = self.state.clone().add_source(&url, mode, &tags)?;
                self.state = next;
                let mut output = format!("Added source #{}\n", self.state.sources.len());
                if let Some(hint) = hint {
                    output.push_str(&format!("  hint: {hint}\n"));
                }
                Ok(output)
            }
            SourceCommand::List => Ok(render::sources(&self.state)),
            SourceCommand::Clear => {
                self.replace_state(WorkflowState::clear_sources);
                Ok("Sources cleared\n".into())
            }
            SourceCommand::Samples => {
                self.replace_state(WorkflowState::add_sample_sources);
                Ok(render::sources(&self.state))
            }
        }
    }

    async fn requirements(&mut self, command: RequirementsCommand) -> Result<String> {
        match command {
            RequirementsCommand::Fetch => {
                let outcome = self
                    .orchestrator
                    .fetch_requirements_preview(&self.state)
                    .await?;
                let developer_mode = self.state.settings.developer_mode;
                let mut shown = outcome.clone();
                if !developer_mode {
                    shown.warnings.clear();
                }
                let mut output = render::outcome(&shown);
                self.state = outcome.state;
                if !self.state.fetched_requirements.is_empty() {
                    output.push_str(&render::requirements(&self.state.fetched_requirements));
                }
                Ok(output)
            }
            RequirementsCommand::Use => {
                let outcome = self.orchestrator.use_fetched_requirements(&self.state)?;
                Ok(self.accept(outcome))
            }
            RequirementsCommand::Clear => {
                self.replace_state(WorkflowState::clear_fetched_requirements);
                Ok("Cleared imported requirements\n".into())
            }
            RequirementsCommand::List => {
                let mut output = String::from("Fetched preview:\n");
                output.push_str(&render::requirements(&self.state.fetched_requirements));
                if let Some(at) = self.state.requirements_fetched_at {
                    output.push_str(&format!(
                        "  (fetched {})\n",
                        at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                    ));
                }
                output.push_str("In use:\n");
                output.push_str(&render::requirements(
                    &self.state.project_config.requirements,
                ));
                Ok(output)
            }
        }
    }

    async fn scenarios(&mut self, command: ScenariosCommand) -> Result<String> {
        match command {
            ScenariosCommand::Generate { max } => {
                let max = max.unwrap_or(self.max_scenarios);
                let outcome = self
                    .orchestrator
                    .create_scenarios(&self.state, max)
                    .await?;
                let mut output = self.accept(outcome);
                output.push_str("Test cases will be 0 until they are generated.\n");
                if self.state.settings.developer_mode {
                    output.push_str(&render::raw(&self.state.artifact_tree));
                }
                Ok(output)
            }
            ScenariosCommand::List { keyword } => {
                let found = search_scenarios(
                    &self.state.artifact_tree,
                    keyword.as_deref().unwrap_or_default(),
                );
                Ok(render::scenario_list(&found))
            }
            ScenariosCommand::Show { id } => {
                Ok(render::scenario_detail(self.find_scenario(&id)?))
            }
        }
    }

    async fn testcases(&mut self, command: TestcasesCommand) -> Result<String> {
        match command {
            TestcasesCommand::Generate => {
                let outcome = self.orchestrator.create_testcases(&self.state).await?;
                let mut output = self.accept(outcome);
                if self.state.settings.developer_mode {
                    output.push_str(&render::raw(&self.state.artifact_tree));
                }
                Ok(output)
            }
            TestcasesCommand::List {
                scenario,
                kind,
                keyword,
            } => {
                let type_filter: TypeFilter = kind.parse()?;
                let scenario = self.find_scenario(&scenario)?;
                let found =
                    filter_testcases(scenario, type_filter, keyword.as_deref().unwrap_or_default());
                Ok(render::testcase_list(&found))
            }
            TestcasesCommand::Show { scenario, tc_id } => {
                let scenario = self.find_scenario(&scenario)?;
                let tc = scenario
                    .test_cases
                    .iter()
                    .find(|tc| tc.tc_id == tc_id)
                    .ok_or_else(|| anyhow!("no test case '{tc_id}' in {}", scenario.scenario_id))?;
                Ok(render::testcase_detail(tc))
            }
        }
    }

    async fn export(&self, kind: &str, out: Option<PathBuf>) -> Result<String> {
        let dir = out.unwrap_or_else(|| self.export_dir.clone());
        let kinds: Vec<ExportKind> = if kind.eq_ignore_ascii_case("all") {
            ExportKind::ALL.to_vec()
        } else {
            vec![kind.parse()?]
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let mut output = String::new();
        for kind in kinds {
            match render_export(&self.state, kind)? {
                Some(body) => {
                    let path = write_export(&dir, kind, &body).await?;
                    output.push_str(&format!("Wrote {}\n", path.display()));
                }
                None => output.push_str(&format!("Skipped {kind}: nothing pushed yet\n")),
            }
        }
        Ok(output)
    }

    async fn draft(&mut self, command: DraftCommand) -> Result<String> {
        match command {
            DraftCommand::Save { name } => {
                let saved = self
                    .orchestrator
                    .save_draft(&self.state, name.as_deref())
                    .await?;
                Ok(render::saved_draft(&saved))
            }
            DraftCommand::Load { name } => {
                let outcome = self.orchestrator.load_draft(&self.state, &name).await?;
                let mut output = self.accept(outcome);
                output.push_str(&render::status(&self.state));
                Ok(output)
            }
            DraftCommand::List => {
                let names = self.orchestrator.list_drafts().await?;
                Ok(render::draft_names(&names))
            }
            DraftCommand::New => {
                self.state = self.orchestrator.new_session(&self.state);
                Ok("Started a new session\n".into())
            }
        }
    }

    fn accept(&mut self, outcome: Outcome) -> String {
        let output = render::outcome(&outcome);
        self.state = outcome.state;
        output
    }

    fn replace_state(&mut self, edit: impl FnOnce(WorkflowState) -> WorkflowState) {
        self.state = edit(std::mem::take(&mut self.state));
    }

    fn find_scenario(&self, id: &str) -> Result<&Scenario> {
        self.state
            .artifact_tree
            .scenarios
            .iter()
            .find(|scenario| scenario.scenario_id == id)
            .ok_or_else(|| anyhow!("no scenario '{id}'"))
    }
}

pub async fn write_export(dir: &Path, kind: ExportKind, body: &str) -> Result<PathBuf> {
    let path = dir.join(kind.file_name());
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn write_prompt(out: &mut impl Write) -> Result<()> {
    out.write_all(PROMPT.as_bytes()).context("writing prompt")?;
    out.flush().context("flushing prompt")
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
