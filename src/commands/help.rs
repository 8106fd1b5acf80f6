/// Static capability listing sent in reply to `!help`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpCard {
    pub title: &'static str,
    pub description: &'static str,
    pub fields: Vec<HelpField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpField {
    pub name: &'static str,
    pub value: &'static str,
}

pub fn help_card() -> HelpCard {
    HelpCard {
        title: "🪂 Glider sees you",
        description: "Here are the available commands:",
        fields: vec![
            HelpField {
                name: "`!glider off`",
                value: "Disables status updates and sets status to `Unknown`",
            },
            HelpField {
                name: "`!glider on`",
                value: "Re-enables status updates from the space API",
            },
            HelpField {
                name: "`!help`",
                value: "Guess what?",
            },
        ],
    }
}
