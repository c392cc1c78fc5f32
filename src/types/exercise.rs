use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Exercise {
    pub key: &'static str,
    pub name: &'static str,
    pub muscle_groups: &'static [&'static str],
    pub description: &'static str,
    pub equipment: &'static str,
}

static EXERCISE_LIBRARY: [Exercise; 8] = [
    Exercise {
        key: "push_ups",
        name: "Push-ups",
        muscle_groups: &["Chest", "Shoulders", "Triceps"],
        description: "Classic bodyweight exercise for upper body strength",
        equipment: "Bodyweight",
    },
    Exercise {
        key: "squats",
        name: "Squats",
        muscle_groups: &["Quadriceps", "Glutes", "Hamstrings"],
        description: "Fundamental lower body exercise",
        equipment: "Bodyweight",
    },
    Exercise {
        key: "deadlifts",
        name: "Deadlifts",
        muscle_groups: &["Hamstrings", "Glutes", "Back"],
        description: "Compound movement for posterior chain",
        equipment: "Barbell",
    },
    Exercise {
        key: "bench_press",
        name: "Bench Press",
        muscle_groups: &["Chest", "Shoulders", "Triceps"],
        description: "Classic upper body pressing movement",
        equipment: "Barbell",
    },
    Exercise {
        key: "pull_ups",
        name: "Pull-ups",
        muscle_groups: &["Back", "Biceps"],
        description: "Bodyweight pulling exercise",
        equipment: "Pull-up bar",
    },
    Exercise {
        key: "lunges",
        name: "Lunges",
        muscle_groups: &["Quadriceps", "Glutes"],
        description: "Single-leg strength exercise",
        equipment: "Bodyweight",
    },
    Exercise {
        key: "planks",
        name: "Planks",
        muscle_groups: &["Core", "Shoulders"],
        description: "Isometric core strengthening exercise",
        equipment: "Bodyweight",
    },
    Exercise {
        key: "rows",
        name: "Rows",
        muscle_groups: &["Back", "Biceps"],
        description: "Horizontal pulling movement",
        equipment: "Dumbbells",
    },
];

pub fn library() -> &'static [Exercise] {
    &EXERCISE_LIBRARY
}

pub fn find(key: &str) -> Option<&'static Exercise> {
    EXERCISE_LIBRARY.iter().find(|e| e.key == key)
}

/// Human readable name for an exercise key; unknown keys are shown as-is.
pub fn display_name(key: &str) -> &str {
    find(key).map(|e| e.name).unwrap_or(key)
}
