/// A fixed benchmark workload: one prompt with a stable id and category.
#[derive(Debug, Clone, Copy)]
pub struct PromptSpec {
    pub id: &'static str,
    pub category: &'static str,
    pub prompt: &'static str,
}

/// The single standardized benchmark model.
pub const BENCHMARK_MODEL: &str = "llama3.1:8b";

/// Short request used to pull the model into memory before the timed run.
/// Its result is always discarded.
pub const WARMUP_PROMPT: PromptSpec = PromptSpec {
    id: "warmup",
    category: "Warmup",
    prompt: "Hello, how are you?",
};

/// Benchmark prompts: diverse workloads to stress different aspects of
/// generation. The list and its order are fixed; scores are only comparable
/// across machines that ran exactly this set.
pub const BENCHMARK_PROMPTS: &[PromptSpec] = &[
    PromptSpec {
        id: "instruct_code",
        category: "Code Generation",
        prompt: "Write a Python function that implements binary search on a sorted list. \
                 Include error handling and type hints.",
    },
    PromptSpec {
        id: "reasoning",
        category: "Reasoning",
        prompt: "A farmer has 17 sheep. All but 9 run away. How many sheep does the farmer \
                 have left? Explain your reasoning step by step.",
    },
    PromptSpec {
        id: "creative_writing",
        category: "Creative Writing",
        prompt: "Write a short story in exactly 3 paragraphs about a robot discovering \
                 music for the first time.",
    },
    PromptSpec {
        id: "summarization",
        category: "Summarization",
        prompt: "Explain quantum computing to a 10-year-old in simple terms. Keep it under \
                 100 words.",
    },
    PromptSpec {
        id: "instruction_following",
        category: "Instruction Following",
        prompt: "List the top 5 largest countries by area. For each, provide the country \
                 name, continent, and approximate area in square kilometers. Format as a \
                 numbered list.",
    },
];
