use tracing::trace;

use crate::category::{
  COMPLETED,
  HOME
};
use crate::task::Task;

/// Matching rule behind a category: the
/// view shown when it is selected and the
/// count cached on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
  All,
  Completed,
  Category(String)
}

impl Filter {
  pub fn for_category(
    name: &str
  ) -> Self {
    match name {
      | HOME => Self::All,
      | COMPLETED => Self::Completed,
      | other => {
        Self::Category(other.to_string())
      }
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Completed => task.completed,
      | Self::Category(name) => {
        task.category == *name
      }
    }
  }

  pub fn count(
    &self,
    tasks: &[Task]
  ) -> u64 {
    tasks
      .iter()
      .filter(|task| self.matches(task))
      .count() as u64
  }

  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect()
  }
}

/// Tasks shown for `selected_category`, in
/// store order.
#[tracing::instrument(skip(all_tasks))]
pub fn visible_tasks<'a>(
  all_tasks: &'a [Task],
  selected_category: &str
) -> Vec<&'a Task> {
  let filter =
    Filter::for_category(selected_category);
  let visible = filter.apply(all_tasks);
  trace!(
    total = all_tasks.len(),
    visible = visible.len(),
    "computed visible tasks"
  );
  visible
}

#[cfg(test)]
mod tests {
  use super::{
    Filter,
    visible_tasks
  };
  use crate::task::Task;

  fn sample() -> Vec<Task> {
    let mut done_work =
      Task::new("Ship build", "Work");
    done_work.completed = true;
    vec![
      Task::new("Write report", "Work"),
      Task::new("Call mum", "Personal"),
      done_work,
      Task::new("Orphan", "Garden"),
    ]
  }

  fn titles(
    tasks: &[&Task]
  ) -> Vec<String> {
    tasks
      .iter()
      .map(|task| task.title.clone())
      .collect()
  }

  #[test]
  fn home_shows_everything_in_order() {
    let tasks = sample();
    let visible =
      visible_tasks(&tasks, "Home");
    assert_eq!(
      titles(&visible),
      vec![
        "Write report",
        "Call mum",
        "Ship build",
        "Orphan"
      ]
    );
  }

  #[test]
  fn completed_ignores_category() {
    let tasks = sample();
    let visible =
      visible_tasks(&tasks, "Completed");
    assert_eq!(
      titles(&visible),
      vec!["Ship build"]
    );
  }

  #[test]
  fn plain_category_is_exact_match() {
    let tasks = sample();
    assert_eq!(
      titles(&visible_tasks(
        &tasks, "Work"
      )),
      vec!["Write report", "Ship build"]
    );
    assert!(
      visible_tasks(&tasks, "work")
        .is_empty()
    );
    assert!(
      visible_tasks(&tasks, "Nowhere")
        .is_empty()
    );
  }

  #[test]
  fn tasks_literally_tagged_home_are_not_special()
   {
    let mut tasks = sample();
    tasks.push(Task::new("Tidy", "Home"));
    assert_eq!(
      Filter::for_category("Home")
        .count(&tasks),
      5
    );
    assert_eq!(
      Filter::Category("Home".to_string())
        .count(&tasks),
      1
    );
  }
}
