//! Prompt templates for the scorer, planner, and novelty judge

use ideaforge_common::models::{CollectionMode, PaperRecord, QueryHistory, ResearchContext};

/// Describe the query grammar the planner must answer in
const QUERY_ACTIONS: &str = "\
You can issue exactly one of the following actions:
(1) KeywordQuery(\"keyword\"): search the paper index for the keyword. Keep keywords short and specific.
(2) PaperQuery(\"paperId\"): find papers similar to the paper with the given paperId.
(3) GetReferences(\"paperId\"): list the papers referenced by the paper with the given paperId.";

fn context_label(mode: CollectionMode) -> &'static str {
    match mode {
        CollectionMode::Topic => "topic description",
        CollectionMode::Idea | CollectionMode::Novelty => "project idea",
    }
}

/// Render papers for inclusion in a prompt
pub fn format_papers(papers: &[PaperRecord], include_score: bool) -> String {
    let mut out = String::new();

    for paper in papers {
        out.push_str(&format!("paperId: {}\n", paper.paper_id));
        out.push_str(&format!("title: {}\n", paper.title.trim()));
        if let Some(year) = paper.year {
            out.push_str(&format!("year: {}\n", year));
        }
        let summary = paper
            .abstract_text
            .as_deref()
            .or(paper.tldr.as_deref())
            .unwrap_or("(no abstract)");
        out.push_str(&format!("abstract: {}\n", summary.trim()));
        if include_score {
            out.push_str(&format!("relevance score: {}\n", paper.score));
        }
        out.push('\n');
    }

    out
}

/// Ask for a 1-10 score per paper as a JSON object
pub fn scoring_prompt(context: &ResearchContext, papers: &[PaperRecord]) -> String {
    let criteria = match context.mode {
        CollectionMode::Topic => "\
1. The paper is directly relevant to the topic description, for example it proposes a method that addresses the topic.
2. The paper is an empirical paper that proposes a novel method and runs experiments, rather than a survey, review, or position paper.
3. The paper is interesting and likely to inspire new research ideas on the topic.",
        CollectionMode::Idea => "\
1. The paper is directly relevant to the project idea and would help develop or evaluate it.
2. The paper is an empirical paper that proposes a novel method and runs experiments, rather than a survey, review, or position paper.
3. The paper provides baselines, datasets, or techniques the project could build on.",
        CollectionMode::Novelty => "\
1. The paper studies the same problem as the project idea.
2. The paper proposes a method similar to the one in the project idea; give the highest scores to papers that already propose essentially the same idea.
3. The paper is an empirical paper rather than a survey, review, or position paper.",
    };

    format!(
        "You are a helpful literature review assistant. Read the {label} and the papers below and score \
         each paper from 1 to 10 using these criteria:\n{criteria}\n\n\
         The {label} is:\n{description}\n\n\
         The papers are:\n{papers}\
         Respond with a single JSON object mapping every paperId to its integer score, for example \
         {{\"paperId1\": 7, \"paperId2\": 3}}. Do not include anything else.",
        label = context_label(context.mode),
        criteria = criteria,
        description = context.description.trim(),
        papers = format_papers(papers, false),
    )
}

/// First query of a run: keyword only, derived from the context alone
pub fn initial_query_prompt(context: &ResearchContext) -> String {
    let goal = match context.mode {
        CollectionMode::Topic => "find papers related to the topic",
        CollectionMode::Idea => "find papers that help develop the project idea",
        CollectionMode::Novelty => "find existing papers that may already propose the project idea",
    };

    format!(
        "You are a researcher doing a literature review. Your goal is to {goal}.\n\n\
         The {label} is:\n{description}\n\n\
         Propose the first search. Respond with exactly one line of the form \
         KeywordQuery(\"keyword\") and nothing else.",
        goal = goal,
        label = context_label(context.mode),
        description = context.description.trim(),
    )
}

/// Subsequent queries, grounded on the current best papers and past queries
pub fn next_query_prompt(
    context: &ResearchContext,
    grounding: &[PaperRecord],
    history: &QueryHistory,
) -> String {
    let papers = if grounding.is_empty() {
        "(no papers found yet)\n\n".to_string()
    } else {
        format_papers(grounding, true)
    };

    let past = if history.is_empty() {
        "(none)".to_string()
    } else {
        history.rendered().join("\n")
    };

    format!(
        "You are a researcher doing a literature review. The {label} is:\n{description}\n\n\
         {actions}\n\n\
         The most relevant papers found so far are:\n{papers}\
         Queries already issued:\n{past}\n\n\
         Propose the next query. Diversify: prefer a different action type or a clearly different \
         keyword from the queries already issued, and do not repeat or paraphrase a past query. \
         Only use paperIds that appear above. Respond with exactly one action and nothing else.",
        label = context_label(context.mode),
        description = context.description.trim(),
        actions = QUERY_ACTIONS,
        papers = papers,
        past = past,
    )
}

/// Ask whether a paper already proposes the idea
pub fn novelty_judge_prompt(idea: &str, paper: &PaperRecord) -> String {
    format!(
        "You are an expert reviewer checking the novelty of a project idea against an existing paper.\n\n\
         The project idea is:\n{idea}\n\n\
         The paper is:\n{paper}\
         Decide whether the paper already proposes essentially the same idea: the same problem and \
         substantially the same method. Related problems or methods do not count. Briefly explain your \
         reasoning, then end your answer with a final line that is exactly \"Decision: Yes\" or \"Decision: No\".",
        idea = idea.trim(),
        paper = format_papers(std::slice::from_ref(paper), false),
    )
}
