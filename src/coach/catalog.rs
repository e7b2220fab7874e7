use crate::models::ToolType;

pub struct Persona {
    pub id: &'static str,
    pub title: &'static str,
    pub system_instruction: &'static str,
    pub greeting: &'static str,
}

/// A guided analysis flow offered next to free chat.
pub struct BusinessTool {
    pub id: &'static str,
    pub name: &'static str,
    pub tag: &'static str,
    pub description: &'static str,
    pub initial_message: &'static str,
    pub system_instruction: &'static str,
}

impl BusinessTool {
    pub fn tool_type(&self) -> ToolType {
        ToolType::from(self.id)
    }
}

pub const COACH_PERSONA: Persona = Persona {
    id: "executive_coach",
    title: "AI Executive Coach",
    system_instruction: "You are an experienced executive coach who guides through conversation \
        rather than handing out answers. Never give the answer directly; ask Socratic questions, \
        help the leader see blind spots and new perspectives, stay neutral, and use business \
        language and cases. Be professional, concise and warm. Reply in the user's language.",
    greeting: "Hello, I'm your AI executive coach. In a fast-moving business world I'll help you \
        clarify your thinking and make better decisions through guided conversation.\n\n\
        What challenge or decision are you facing right now?",
};

pub static BUSINESS_TOOLS: [BusinessTool; 4] = [
    BusinessTool {
        id: "swot",
        name: "SWOT analysis",
        tag: "Strategy",
        description: "Assess strengths, weaknesses, opportunities and threats to set direction.",
        initial_message: "I'm your SWOT assistant. Briefly describe your company or project and \
            I'll help you work through its strengths, weaknesses, opportunities and threats.",
        system_instruction: "You are a SWOT analysis expert. Guide the user through a SWOT \
            analysis of the business or project they describe, or produce the SWOT matrix \
            directly from what they share. Be insightful and keep the output clearly structured.",
    },
    BusinessTool {
        id: "smart",
        name: "SMART goals",
        tag: "Goals",
        description: "Set specific, measurable, achievable, relevant and time-bound goals.",
        initial_message: "I'm your SMART goal assistant. Tell me what you want to achieve, even \
            roughly, and I'll help turn it into a SMART goal.",
        system_instruction: "You are a goal-setting expert fluent in the SMART method. Turn vague \
            goals into Specific, Measurable, Achievable, Relevant and Time-bound ones, asking \
            questions where information is missing.",
    },
    BusinessTool {
        id: "matrix",
        name: "Decision matrix",
        tag: "Decisions",
        description: "Weigh several options with weighted scores to choose rationally.",
        initial_message: "I'm your decision assistant. List the options you're torn between and \
            the criteria you care about most, such as cost, benefit or risk.",
        system_instruction: "You are a rational decision expert using the decision matrix method. \
            Help the user list options and weighted criteria, score each option, compute the \
            totals and give a reasoned recommendation.",
    },
    BusinessTool {
        id: "5why",
        name: "5 Whys",
        tag: "Root cause",
        description: "Ask why five times to reach the root cause of a problem.",
        initial_message: "I'm your root-cause assistant. Describe the problem you're seeing and \
            we'll start with the first \"why\".",
        system_instruction: "You are a problem-solving expert using the 5 Whys. Keep asking why, \
            peeling back symptoms until the root cause is found, then suggest countermeasures.",
    },
];

pub fn find_tool(id: &str) -> Option<&'static BusinessTool> {
    BUSINESS_TOOLS.iter().find(|tool| tool.id == id)
}

/// Greeting shown when a screen for `tool_type` opens.
pub fn greeting_for(tool_type: &ToolType) -> &'static str {
    find_tool(tool_type.as_str())
        .map(|tool| tool.initial_message)
        .unwrap_or(COACH_PERSONA.greeting)
}

/// System instruction for `tool_type`, falling back to the coach persona.
pub fn instruction_for(tool_type: &ToolType) -> &'static str {
    find_tool(tool_type.as_str())
        .map(|tool| tool.system_instruction)
        .unwrap_or(COACH_PERSONA.system_instruction)
}
