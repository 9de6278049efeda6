//! Built-in form catalog used when no catalog files are configured.

use super::types::{FormDefinition, QuestionDefinition, QuestionKind};

/// Id of the standalone student registration form.
pub const STUDENT_REGISTRATION_FORM_ID: &str = "student-registration-form";

const INDIAN_STATES: &[&str] = &[
    "Andaman and Nicobar Islands",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Dadra and Nagar Haveli",
    "Daman and Diu",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

fn choices(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

/// Village baseline survey.
pub fn baseline_survey() -> FormDefinition {
    FormDefinition::new(
        "baseline-survey-adarsh-sanch",
        "Baseline Survey - Adarsh Sanch",
        "Household baseline covering schooling, health and livelihood in the village",
        vec![
            QuestionDefinition::text("respondent_name", "Name of the respondent")
                .with_placeholder("Type your answer..."),
            QuestionDefinition::new(
                "household_size",
                "How many people live in your household?",
                QuestionKind::Dropdown {
                    options: choices(&["1-2", "3-4", "5-6", "7 or more"]),
                },
            ),
            QuestionDefinition::new(
                "children_in_school",
                "Do all school-age children in the household attend school?",
                QuestionKind::MultipleChoice {
                    options: choices(&["Yes", "Some of them", "No", "No school-age children"]),
                },
            ),
            QuestionDefinition::new(
                "facilities",
                "Which facilities are available in the village?",
                QuestionKind::Checkboxes {
                    options: choices(&[
                        "Primary school",
                        "Health centre",
                        "Drinking water",
                        "Electricity",
                        "Bank or post office",
                    ]),
                },
            ),
            QuestionDefinition::new(
                "livelihood_satisfaction",
                "How satisfied are you with livelihood opportunities?",
                QuestionKind::Rating { max: 5 },
            ),
            QuestionDefinition::new(
                "needs",
                "What is the most pressing need of the village?",
                QuestionKind::Textarea,
            )
            .with_placeholder("Type your detailed answer..."),
        ],
    )
}

/// Short feedback survey after a training session.
pub fn session_feedback_survey() -> FormDefinition {
    FormDefinition::new(
        "session-feedback",
        "Session Feedback",
        "Tell us how the training session went",
        vec![
            QuestionDefinition::new(
                "overall",
                "Overall rating of the session",
                QuestionKind::Rating { max: 10 },
            ),
            QuestionDefinition::new(
                "pace",
                "How was the pace?",
                QuestionKind::MultipleChoice {
                    options: choices(&["Too slow", "Just right", "Too fast"]),
                },
            ),
            QuestionDefinition::new(
                "comments",
                "Anything else you would like to share?",
                QuestionKind::Textarea,
            ),
        ],
    )
}

/// Standalone student registration form.
pub fn student_registration_form() -> FormDefinition {
    FormDefinition::new(
        STUDENT_REGISTRATION_FORM_ID,
        "Student Registration",
        "Please fill in all the required information for student registration",
        vec![
            QuestionDefinition::text("fname", "First Name")
                .required()
                .with_placeholder("Enter first name"),
            QuestionDefinition::text("lname", "Last Name")
                .required()
                .with_placeholder("Enter last name"),
            QuestionDefinition::dropdown("gender", "Gender", &["Male", "Female"])
                .required()
                .with_placeholder("Select gender"),
            QuestionDefinition::text("fathername", "Father's Name")
                .required()
                .with_placeholder("Enter father's name"),
            QuestionDefinition::text("occupation", "Occupation")
                .with_placeholder("Enter occupation"),
            QuestionDefinition::text("dob", "Date of Birth").with_placeholder("YYYY-MM-DD"),
            QuestionDefinition::text("qualification", "Qualification")
                .with_placeholder("Enter qualification"),
            QuestionDefinition::text("addhar", "Aadhar Number")
                .with_placeholder("Enter Aadhar number"),
            QuestionDefinition::text("mobilenumber", "Mobile Number")
                .required()
                .with_placeholder("Enter mobile number"),
            QuestionDefinition::text("emailId", "Email Id")
                .with_placeholder("Enter email address"),
            QuestionDefinition::dropdown(
                "financialbackground",
                "Financial Background",
                &["APL", "BPL"],
            )
            .with_placeholder("Select financial background"),
            QuestionDefinition::text("village", "Village")
                .required()
                .with_placeholder("Enter village name"),
            QuestionDefinition::text("block", "Block").with_placeholder("Enter block name"),
            QuestionDefinition::text("district", "District")
                .with_placeholder("Enter district name"),
            QuestionDefinition::dropdown("state", "State", INDIAN_STATES)
                .with_placeholder("Select state"),
            QuestionDefinition::text("enrollment", "Enrollment")
                .with_placeholder("Enter enrollment number"),
        ],
    )
}

/// Volunteer registration for the registration portal.
pub fn volunteer_registration_form() -> FormDefinition {
    FormDefinition::new(
        "volunteer-registration",
        "Volunteer Registration",
        "Register as a volunteer for village programmes",
        vec![
            QuestionDefinition::text("fname", "First Name").required(),
            QuestionDefinition::text("lname", "Last Name"),
            QuestionDefinition::text("mobilenumber", "Mobile Number").required(),
            QuestionDefinition::new(
                "availability",
                "When are you available?",
                QuestionKind::Checkboxes {
                    options: choices(&["Weekdays", "Weekends", "Evenings"]),
                },
            ),
            QuestionDefinition::dropdown(
                "programme",
                "Preferred programme",
                &["Education", "Health", "Livelihood"],
            ),
        ],
    )
}

/// All built-in surveys, in display order.
pub fn builtin_surveys() -> Vec<FormDefinition> {
    vec![baseline_survey(), session_feedback_survey()]
}

/// All built-in registration forms, in display order.
pub fn builtin_registrations() -> Vec<FormDefinition> {
    vec![volunteer_registration_form(), student_registration_form()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        for form in builtin_surveys().iter().chain(builtin_registrations().iter()) {
            assert!(form.validate().is_ok(), "{} should be valid", form.id);
        }
    }

    #[test]
    fn test_student_form_required_fields() {
        let form = student_registration_form();
        let required: Vec<&str> = form.required_ids().collect();
        assert_eq!(
            required,
            vec!["fname", "lname", "gender", "fathername", "mobilenumber", "village"]
        );
    }
}
