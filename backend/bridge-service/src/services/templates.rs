//! Description templates for recommendations
//!
//! `{name}` placeholders are replaced from the supplied variables; any
//! placeholder without a value is left as written.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::RecommendationType;

pub struct Template {
    pub id: &'static str,
    pub rec_type: RecommendationType,
    pub text: &'static str,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "local_group.invite",
        rec_type: RecommendationType::LocalGroup,
        text: "I noticed you're interested in {interest}, and there's a group in {city} called '{groupName}' with {memberCount} members. Would you like to join them? You'd earn {rewardPoints} RPs for joining!",
    },
    Template {
        id: "local_group.topics",
        rec_type: RecommendationType::LocalGroup,
        text: "Have you heard about '{groupName}' in {city}? They're focused on {topics}, which aligns with your interest in {userInterest}. {memberCount} people are already part of it. Want to connect with them?",
    },
    Template {
        id: "event.upcoming",
        rec_type: RecommendationType::Event,
        text: "There's an event coming up on {date} called '{eventTitle}' at {location}. It's about {topics}, which I think you'd find interesting given your focus on {userInterest}. {rsvpCount} people have already RSVP'd. Want to join them?",
    },
    Template {
        id: "event.reward",
        rec_type: RecommendationType::Event,
        text: "I see '{eventTitle}' is happening {date} in your area. This could be a great opportunity to connect with others interested in {topics}. Attending could earn you {rewardPoints} RPs!",
    },
    Template {
        id: "discussion.active",
        rec_type: RecommendationType::Discussion,
        text: "There's an active discussion in '{groupName}' about '{discussionTitle}'. {participantCount} people are already talking about {topics}. Given your interest in {userInterest}, you might have valuable insights to share. Want to join the conversation?",
    },
    Template {
        id: "activity.city_ready",
        rec_type: RecommendationType::Activity,
        text: "With {memberCount} members in {city}, your community is ready for '{activityName}'. This is a {difficulty} activity that takes about {timeCommitment}. {description} You could earn {rewardPoints} RPs by organizing or participating. Want to give it a try?",
    },
    Template {
        id: "activity.city_size",
        rec_type: RecommendationType::Activity,
        text: "Based on your city's size ({memberCount} members), I'd suggest trying '{activityName}'. {description} {examples}. This could be a great next step for your community. Interested?",
    },
    Template {
        id: "thematic_group.national",
        rec_type: RecommendationType::ThematicGroup,
        text: "Since you're interested in {userInterest}, you might want to join the national group '{groupName}'. It connects people across the country who share your passion. You'd earn {rewardPoints} RPs for joining!",
    },
    Template {
        id: "social_share.project",
        rec_type: RecommendationType::SocialShare,
        text: "Would you be willing to share your experience with {projectName} on social media? It helps more people discover cooperation. I can help you draft a post, and you'll earn {rewardPoints} RPs for amplifying the message!",
    },
    Template {
        id: "social_share.city",
        rec_type: RecommendationType::SocialShare,
        text: "Your work in {city} is inspiring! Have you thought about sharing your story on social media? It could help others in similar communities. Plus, you'd earn {rewardPoints} RPs. Want me to help you craft a post?",
    },
];

pub fn find(template_id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == template_id)
}

/// Default template for a recommendation type
pub fn default_for(rec_type: RecommendationType) -> &'static Template {
    TEMPLATES
        .iter()
        .find(|t| t.rec_type == rec_type)
        .unwrap_or(&TEMPLATES[0])
}

pub fn templates_for(rec_type: RecommendationType) -> impl Iterator<Item = &'static Template> {
    TEMPLATES.iter().filter(move |t| t.rec_type == rec_type)
}

/// Substitute `{key}` placeholders in `text`.
pub fn fill(text: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render a template by id.
pub fn render(template_id: &str, vars: &HashMap<&str, String>) -> Result<String> {
    let template = find(template_id)
        .ok_or_else(|| AppError::Validation(format!("unknown template: {}", template_id)))?;
    Ok(fill(template.text, vars))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn renders_group_invite() {
        let text = render(
            "local_group.invite",
            &vars(&[
                ("interest", "housing"),
                ("city", "Portland"),
                ("groupName", "Housing Co-op"),
                ("memberCount", "23"),
                ("rewardPoints", "50"),
            ]),
        )
        .unwrap();
        assert_eq!(
            text,
            "I noticed you're interested in housing, and there's a group in Portland called \
             'Housing Co-op' with 23 members. Would you like to join them? You'd earn 50 RPs \
             for joining!"
        );
    }

    #[test]
    fn missing_values_leave_placeholders() {
        let text = fill("Hello {name}, welcome to {city}", &vars(&[("name", "Ada")]));
        assert_eq!(text, "Hello Ada, welcome to {city}");
        assert_eq!(fill("unterminated {brace", &vars(&[])), "unterminated {brace");
    }

    #[test]
    fn unknown_template_is_a_validation_error() {
        let err = render("nope", &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn every_type_has_a_default() {
        for rec_type in [
            RecommendationType::LocalGroup,
            RecommendationType::Event,
            RecommendationType::Activity,
            RecommendationType::Discussion,
            RecommendationType::ThematicGroup,
            RecommendationType::SocialShare,
        ] {
            assert_eq!(default_for(rec_type).rec_type, rec_type);
            assert!(templates_for(rec_type).count() >= 1);
        }
    }
}
