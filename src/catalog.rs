//! Built-in topic catalog.
//!
//! This is the list shipped with the binary. A TOML config may replace it
//! (`catalog = [...]`), but it is never edited at runtime.

/// Full ordered catalog of exercise topics.
pub const DEFAULT_CATALOG: &[&str] = &[
  "Fibonacci Number",
  "Amstrong Prime and Largest among three",
  "Array creation display and element Search",
  "Permutation of Strings",
  "Calculate length of string reverse the string and copy it to another string without using any library functions",
  "Graphics (Draw Rectangle Circle and Triangle and perform rotation scaling and translation operation)",
  "Digital and Analogue Clock",
  "File operations: Reading Writing a 1. String 2. Binary and closing a file",
  "Menu driven file operation to store n number of student name and marks and perform 1. Append new records 2. Delete record 3. Update record 4. Display Records operations",
  "Menu driven file operation to perform 1. Print file content 2. Copy file content from one file to another 3. Merge 2 file contents 4. Delete a specific file",
  "PGM Image to negative image",
  "Menu driven file operation (.CSV file) to store n number of student name and marks and perform 1. Insert new records 2. Delete record 3. Update record 4. Search Records operations",
  "Array : Creation Display Linear Search Binary Search Insertion Deletion by 1. Given position and 2. given item",
  "Array: Creation Display Selection Sort",
  "Array: Creation Display Bubble Sort Modified Bubble Sort",
  "Array: Creation Display Insertion sort",
  "Array: Creation Display Merge Sort",
  "Dynamic Linked List: Creation Display Display using recursion Searching Insertion Deletion Reverse print Reverse linked list",
  "Dynamic Double Linked List: Creation Display Display using recursion Searching Insertion Deletion Reverse print Reverse linked list",
  "Circular Linked List: Creation Display Insertion Deletion Searching",
  "Stack: Push Pop Display",
  "Infix to Postfix expression",
  "Implement postfix evaluation algorithm",
  "Static Queue: Insertion Deletion Display",
  "Dynamic Queue: Insertion Deletion Display",
  "Circular Queue: Insertion Deletion Display",
  "Tower of Hanoi",
  "BST (Binary Search Tree) : Creation In order Traversal Post Order Traversal Pre order traversal Searching Insertion Deletion",
  "Heap Tree (Max Heap) using array : Creation In order pre order and post order traversal Sorting Display original and sorted list",
];

pub fn default_catalog() -> Vec<String> {
  DEFAULT_CATALOG.iter().map(|s| s.to_string()).collect()
}
